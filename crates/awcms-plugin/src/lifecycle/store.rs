//! Persistence seam for the registry tables.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use awcms_core::error::{AppError, ErrorKind};
use awcms_core::result::AppResult;
use awcms_database::repositories::RegistryRepository;
use awcms_entity::registry::{CorePermission, ExtensionPermission, NewMenuItem, NewRouteEntry};

/// Storage for the route, menu and permission registries.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Replaces every route row of an extension.
    async fn replace_routes(&self, extension_id: Uuid, routes: &[NewRouteEntry]) -> AppResult<()>;

    /// Replaces every menu row of an extension.
    async fn replace_menus(&self, extension_id: Uuid, menus: &[NewMenuItem]) -> AppResult<()>;

    /// Inserts or updates an extension permission.
    async fn upsert_extension_permission(&self, permission: &ExtensionPermission) -> AppResult<()>;

    /// Inserts a core permission, leaving an existing one untouched.
    async fn upsert_core_permission(&self, permission: &CorePermission) -> AppResult<()>;

    /// Sets `is_active` on every route and menu row of an extension.
    async fn set_registry_active(&self, extension_id: Uuid, is_active: bool) -> AppResult<()>;
}

#[async_trait]
impl RegistryStore for RegistryRepository {
    async fn replace_routes(&self, extension_id: Uuid, routes: &[NewRouteEntry]) -> AppResult<()> {
        RegistryRepository::replace_routes(self, extension_id, routes).await
    }

    async fn replace_menus(&self, extension_id: Uuid, menus: &[NewMenuItem]) -> AppResult<()> {
        RegistryRepository::replace_menus(self, extension_id, menus).await
    }

    async fn upsert_extension_permission(&self, permission: &ExtensionPermission) -> AppResult<()> {
        RegistryRepository::upsert_extension_permission(self, permission).await
    }

    async fn upsert_core_permission(&self, permission: &CorePermission) -> AppResult<()> {
        RegistryRepository::upsert_core_permission(self, permission).await
    }

    async fn set_registry_active(&self, extension_id: Uuid, is_active: bool) -> AppResult<()> {
        self.set_active(extension_id, is_active).await
    }
}

/// Registry operations, used to inject failures into [`MemoryRegistryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// `replace_routes`
    ReplaceRoutes,
    /// `replace_menus`
    ReplaceMenus,
    /// `upsert_extension_permission`
    UpsertExtensionPermission,
    /// `upsert_core_permission`
    UpsertCorePermission,
    /// `set_registry_active`
    SetActive,
}

#[derive(Debug, Default)]
struct MemoryTables {
    routes: HashMap<Uuid, Vec<NewRouteEntry>>,
    menus: HashMap<Uuid, Vec<NewMenuItem>>,
    extension_permissions: BTreeMap<(Uuid, String), ExtensionPermission>,
    core_permissions: BTreeMap<String, CorePermission>,
}

/// In-memory registry store for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryRegistryStore {
    tables: RwLock<MemoryTables>,
    failures: RwLock<HashMap<StoreOp, ErrorKind>>,
}

impl MemoryRegistryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call of `op` fail with `kind`.
    pub async fn fail_on(&self, op: StoreOp, kind: ErrorKind) {
        self.failures.write().await.insert(op, kind);
    }

    async fn check(&self, op: StoreOp) -> AppResult<()> {
        match self.failures.read().await.get(&op) {
            Some(kind) => Err(AppError::new(*kind, format!("Injected failure on {op:?}"))),
            None => Ok(()),
        }
    }

    /// Route rows of an extension.
    pub async fn routes(&self, extension_id: Uuid) -> Vec<NewRouteEntry> {
        self.tables
            .read()
            .await
            .routes
            .get(&extension_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Menu rows of an extension.
    pub async fn menus(&self, extension_id: Uuid) -> Vec<NewMenuItem> {
        self.tables
            .read()
            .await
            .menus
            .get(&extension_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Extension permission rows of an extension, sorted by name.
    pub async fn extension_permissions(&self, extension_id: Uuid) -> Vec<ExtensionPermission> {
        self.tables
            .read()
            .await
            .extension_permissions
            .values()
            .filter(|p| p.extension_id == extension_id)
            .cloned()
            .collect()
    }

    /// All core permission rows, sorted by name.
    pub async fn core_permissions(&self) -> Vec<CorePermission> {
        self.tables
            .read()
            .await
            .core_permissions
            .values()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RegistryStore for MemoryRegistryStore {
    async fn replace_routes(&self, extension_id: Uuid, routes: &[NewRouteEntry]) -> AppResult<()> {
        self.check(StoreOp::ReplaceRoutes).await?;
        self.tables
            .write()
            .await
            .routes
            .insert(extension_id, routes.to_vec());
        Ok(())
    }

    async fn replace_menus(&self, extension_id: Uuid, menus: &[NewMenuItem]) -> AppResult<()> {
        self.check(StoreOp::ReplaceMenus).await?;
        self.tables
            .write()
            .await
            .menus
            .insert(extension_id, menus.to_vec());
        Ok(())
    }

    async fn upsert_extension_permission(&self, permission: &ExtensionPermission) -> AppResult<()> {
        self.check(StoreOp::UpsertExtensionPermission).await?;
        self.tables.write().await.extension_permissions.insert(
            (permission.extension_id, permission.permission_name.clone()),
            permission.clone(),
        );
        Ok(())
    }

    async fn upsert_core_permission(&self, permission: &CorePermission) -> AppResult<()> {
        self.check(StoreOp::UpsertCorePermission).await?;
        self.tables
            .write()
            .await
            .core_permissions
            .entry(permission.name.clone())
            .or_insert_with(|| permission.clone());
        Ok(())
    }

    async fn set_registry_active(&self, extension_id: Uuid, is_active: bool) -> AppResult<()> {
        self.check(StoreOp::SetActive).await?;
        let mut tables = self.tables.write().await;
        if let Some(routes) = tables.routes.get_mut(&extension_id) {
            routes.iter_mut().for_each(|r| r.is_active = is_active);
        }
        if let Some(menus) = tables.menus.get_mut(&extension_id) {
            menus.iter_mut().for_each(|m| m.is_active = is_active);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_core_permission_keeps_first_row() {
        let store = MemoryRegistryStore::new();
        let id = Uuid::new_v4();
        let first = CorePermission::registered_by(id, "ext.read");
        let mut second = CorePermission::registered_by(Uuid::new_v4(), "ext.read");
        second.description = Some("other".into());

        store.upsert_core_permission(&first).await.unwrap();
        store.upsert_core_permission(&second).await.unwrap();

        assert_eq!(store.core_permissions().await, vec![first]);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MemoryRegistryStore::new();
        store.fail_on(StoreOp::ReplaceMenus, ErrorKind::ServiceUnavailable).await;
        let err = store.replace_menus(Uuid::new_v4(), &[]).await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
