//! Registry table repository: routes, menu items and permissions.

use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use awcms_core::result::AppResult;
use awcms_entity::registry::{
    CorePermission, ExtensionPermission, MenuItemEntry, NewMenuItem, NewRouteEntry,
    RouteRegistryEntry,
};

use crate::error::map_sqlx_error;

/// Repository for `extension_routes_registry`, `extension_menu_items`,
/// `extension_permissions` and the core `permissions` table.
#[derive(Debug, Clone)]
pub struct RegistryRepository {
    pool: PgPool,
}

impl RegistryRepository {
    /// Create a new registry repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replace every route row of an extension with `routes`.
    ///
    /// The delete and the bulk insert run in one transaction; a failing row
    /// leaves the previous rows in place.
    pub async fn replace_routes(&self, extension_id: Uuid, routes: &[NewRouteEntry]) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("Failed to start route replacement", e))?;

        sqlx::query("DELETE FROM extension_routes_registry WHERE extension_id = $1")
            .bind(extension_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete extension routes", e))?;

        if !routes.is_empty() {
            route_insert(routes)
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("Failed to insert extension routes", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("Failed to commit route replacement", e))
    }

    /// Replace every menu item of an extension with `menus`, atomically.
    pub async fn replace_menus(&self, extension_id: Uuid, menus: &[NewMenuItem]) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("Failed to start menu replacement", e))?;

        sqlx::query("DELETE FROM extension_menu_items WHERE extension_id = $1")
            .bind(extension_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete extension menu items", e))?;

        if !menus.is_empty() {
            menu_insert(menus)
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("Failed to insert extension menu items", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("Failed to commit menu replacement", e))
    }

    /// Upsert an extension-scoped permission row.
    pub async fn upsert_extension_permission(
        &self,
        permission: &ExtensionPermission,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO extension_permissions (extension_id, permission_name, description) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (extension_id, permission_name) DO UPDATE SET description = EXCLUDED.description",
        )
        .bind(permission.extension_id)
        .bind(&permission.permission_name)
        .bind(&permission.description)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(|e| map_sqlx_error("Failed to upsert extension permission", e))
    }

    /// Upsert a core permission keyed by name.
    pub async fn upsert_core_permission(&self, permission: &CorePermission) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO permissions (name, resource, action, description) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(&permission.name)
        .bind(&permission.resource)
        .bind(&permission.action)
        .bind(&permission.description)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(|e| map_sqlx_error("Failed to upsert core permission", e))
    }

    /// Flip `is_active` on every route and menu row of an extension.
    pub async fn set_active(&self, extension_id: Uuid, is_active: bool) -> AppResult<()> {
        sqlx::query("UPDATE extension_routes_registry SET is_active = $2 WHERE extension_id = $1")
            .bind(extension_id)
            .bind(is_active)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to toggle extension routes", e))?;

        sqlx::query("UPDATE extension_menu_items SET is_active = $2 WHERE extension_id = $1")
            .bind(extension_id)
            .bind(is_active)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to toggle extension menu items", e))?;

        Ok(())
    }

    /// List route rows of an extension.
    pub async fn find_routes(&self, extension_id: Uuid) -> AppResult<Vec<RouteRegistryEntry>> {
        sqlx::query_as::<_, RouteRegistryEntry>(
            "SELECT * FROM extension_routes_registry WHERE extension_id = $1 ORDER BY path ASC",
        )
        .bind(extension_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to list extension routes", e))
    }

    /// List menu rows of an extension.
    pub async fn find_menus(&self, extension_id: Uuid) -> AppResult<Vec<MenuItemEntry>> {
        sqlx::query_as::<_, MenuItemEntry>(
            "SELECT * FROM extension_menu_items WHERE extension_id = $1 ORDER BY \"order\" ASC",
        )
        .bind(extension_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to list extension menu items", e))
    }

    /// List permission metadata rows of an extension.
    pub async fn find_permissions(
        &self,
        extension_id: Uuid,
    ) -> AppResult<Vec<ExtensionPermission>> {
        sqlx::query_as::<_, ExtensionPermission>(
            "SELECT extension_id, permission_name, description FROM extension_permissions \
             WHERE extension_id = $1 ORDER BY permission_name ASC",
        )
        .bind(extension_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to list extension permissions", e))
    }
}

/// Single multi-row insert for route rows.
fn route_insert(routes: &[NewRouteEntry]) -> QueryBuilder<'_, Postgres> {
    let mut insert = QueryBuilder::new(
        "INSERT INTO extension_routes_registry \
         (extension_id, path, component_key, name, icon, requires_auth, required_permissions, is_active) ",
    );
    insert.push_values(routes, |mut row, route| {
        row.push_bind(route.extension_id)
            .push_bind(&route.path)
            .push_bind(&route.component_key)
            .push_bind(&route.name)
            .push_bind(&route.icon)
            .push_bind(route.requires_auth)
            .push_bind(&route.required_permissions)
            .push_bind(route.is_active);
    });
    insert
}

/// Single multi-row insert for menu rows.
fn menu_insert(menus: &[NewMenuItem]) -> QueryBuilder<'_, Postgres> {
    let mut insert = QueryBuilder::new(
        "INSERT INTO extension_menu_items (extension_id, label, path, icon, \"order\", is_active) ",
    );
    insert.push_values(menus, |mut row, menu| {
        row.push_bind(menu.extension_id)
            .push_bind(&menu.label)
            .push_bind(&menu.path)
            .push_bind(&menu.icon)
            .push_bind(menu.sort_order)
            .push_bind(menu.is_active);
    });
    insert
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(extension_id: Uuid, path: &str) -> NewRouteEntry {
        NewRouteEntry {
            extension_id,
            path: path.to_string(),
            component_key: None,
            name: None,
            icon: None,
            requires_auth: true,
            required_permissions: Vec::new(),
            is_active: true,
        }
    }

    #[test]
    fn test_routes_insert_as_one_statement() {
        let id = Uuid::new_v4();
        let routes = vec![route(id, "/a"), route(id, "/b"), route(id, "/c")];
        let insert = route_insert(&routes);
        let sql = insert.sql();

        assert_eq!(sql.matches("INSERT INTO").count(), 1);
        assert!(sql.contains("VALUES ($1, "), "{sql}");
        assert!(sql.contains("($17, "), "{sql}");
        assert!(sql.ends_with("$24)"), "{sql}");
    }

    #[test]
    fn test_menus_insert_as_one_statement() {
        let id = Uuid::new_v4();
        let menus: Vec<NewMenuItem> = ["Backups", "Schedules"]
            .iter()
            .enumerate()
            .map(|(i, label)| NewMenuItem {
                extension_id: id,
                label: label.to_string(),
                path: format!("/{label}"),
                icon: None,
                sort_order: i as i32,
                is_active: true,
            })
            .collect();
        let insert = menu_insert(&menus);
        let sql = insert.sql();

        assert_eq!(sql.matches("INSERT INTO").count(), 1);
        assert!(sql.ends_with("$12)"), "{sql}");
    }
}
