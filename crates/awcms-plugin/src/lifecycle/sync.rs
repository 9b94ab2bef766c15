//! Registry projection of an extension's declared configuration.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};
use uuid::Uuid;

use awcms_core::error::AppError;
use awcms_entity::extension::{ExtensionConfig, MenuDeclaration, RouteDeclaration};
use awcms_entity::registry::{CorePermission, ExtensionPermission, NewMenuItem, NewRouteEntry};

use crate::error::ExtensionError;

use super::store::RegistryStore;

/// Menu order base for items without an explicit order.
const UNORDERED_MENU_BASE: i32 = 99;

/// A step of a registry sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStep {
    /// Replacing route rows.
    Routes,
    /// Replacing menu rows.
    Menus,
    /// Upserting extension permission metadata.
    ExtensionPermissions,
    /// Upserting core permissions.
    CorePermissions,
    /// Toggling route and menu activation.
    Activation,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Routes => "routes",
            Self::Menus => "menus",
            Self::ExtensionPermissions => "extension_permissions",
            Self::CorePermissions => "core_permissions",
            Self::Activation => "activation",
        };
        f.write_str(name)
    }
}

/// What a sync wrote and which steps failed.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Route rows written, `None` when routes were not declared.
    pub routes: Option<usize>,
    /// Menu rows written, `None` when menus were not declared.
    pub menus: Option<usize>,
    /// Permissions processed, `None` when permissions were not declared.
    pub permissions: Option<usize>,
    /// Steps that failed and were skipped.
    pub failures: Vec<ExtensionError>,
}

impl SyncReport {
    /// Whether every step succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Projects extension declarations into a [`RegistryStore`].
#[derive(Clone)]
pub struct LifecycleSync {
    store: Arc<dyn RegistryStore>,
}

impl LifecycleSync {
    /// Creates a sync over `store`.
    pub fn new(store: Arc<dyn RegistryStore>) -> Self {
        Self { store }
    }

    /// Replaces the extension's routes and menus with its declared ones and
    /// registers its permissions.
    ///
    /// Absent sections are left untouched and a `None` config does nothing.
    /// A failing step is logged and reported while the remaining steps still
    /// run. Only an unreachable backend aborts the sync.
    pub async fn sync_extension_to_registry(
        &self,
        extension_id: Uuid,
        config: Option<&ExtensionConfig>,
    ) -> Result<SyncReport, ExtensionError> {
        let mut report = SyncReport::default();
        let Some(config) = config else {
            return Ok(report);
        };

        info!(extension_id = %extension_id, "Syncing extension to registry");

        if let Some(routes) = &config.routes {
            let rows = project_routes(extension_id, routes);
            let result = self.store.replace_routes(extension_id, &rows).await;
            if record(&mut report, extension_id, SyncStep::Routes, result)? {
                report.routes = Some(rows.len());
            }
        }

        if let Some(menus) = &config.menus {
            let rows = project_menus(extension_id, menus);
            let result = self.store.replace_menus(extension_id, &rows).await;
            if record(&mut report, extension_id, SyncStep::Menus, result)? {
                report.menus = Some(rows.len());
            }
        }

        if let Some(permissions) = &config.permissions {
            for name in permissions {
                let row = ExtensionPermission::declared_by(extension_id, name);
                let result = self.store.upsert_extension_permission(&row).await;
                record(&mut report, extension_id, SyncStep::ExtensionPermissions, result)?;
            }

            for name in permissions {
                let row = CorePermission::registered_by(extension_id, name);
                match self.store.upsert_core_permission(&row).await {
                    Err(e) if e.is_conflict() => {
                        debug!(permission = %name, "Core permission already registered");
                    }
                    result => {
                        record(&mut report, extension_id, SyncStep::CorePermissions, result)?;
                    }
                }
            }

            report.permissions = Some(permissions.len());
        }

        info!(
            extension_id = %extension_id,
            routes = ?report.routes,
            menus = ?report.menus,
            permissions = ?report.permissions,
            failures = report.failures.len(),
            "Extension registry sync finished"
        );

        Ok(report)
    }

    /// Marks the extension's routes and menus active.
    pub async fn activate_extension_registry(&self, extension_id: Uuid) -> Result<(), ExtensionError> {
        self.set_active(extension_id, true).await
    }

    /// Marks the extension's routes and menus inactive.
    ///
    /// Permissions are left registered.
    pub async fn deactivate_extension_registry(
        &self,
        extension_id: Uuid,
    ) -> Result<(), ExtensionError> {
        self.set_active(extension_id, false).await
    }

    async fn set_active(&self, extension_id: Uuid, is_active: bool) -> Result<(), ExtensionError> {
        self.store
            .set_registry_active(extension_id, is_active)
            .await
            .map_err(|source| ExtensionError::Sync {
                step: SyncStep::Activation,
                source,
            })?;

        info!(extension_id = %extension_id, is_active, "Extension registry activation updated");
        Ok(())
    }
}

impl fmt::Debug for LifecycleSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleSync").finish()
    }
}

/// Records a step result. Returns whether it succeeded, or the error when
/// the backend is unreachable.
fn record(
    report: &mut SyncReport,
    extension_id: Uuid,
    step: SyncStep,
    result: Result<(), AppError>,
) -> Result<bool, ExtensionError> {
    match result {
        Ok(()) => Ok(true),
        Err(source) if source.is_unavailable() => Err(ExtensionError::Sync { step, source }),
        Err(source) => {
            error!(extension_id = %extension_id, step = %step, error = %source, "Registry sync step failed");
            report.failures.push(ExtensionError::Sync { step, source });
            Ok(false)
        }
    }
}

/// Route rows for declared routes. Routes require auth unless they opt out.
pub fn project_routes(extension_id: Uuid, routes: &[RouteDeclaration]) -> Vec<NewRouteEntry> {
    routes
        .iter()
        .map(|route| NewRouteEntry {
            extension_id,
            path: route.path.clone(),
            component_key: route.component.clone(),
            name: route.name.clone(),
            icon: route.icon.clone(),
            requires_auth: route.requires_auth.unwrap_or(true),
            required_permissions: route.permissions.clone().unwrap_or_default(),
            is_active: true,
        })
        .collect()
}

/// Menu rows for declared menus. Unordered items sort after ordered ones,
/// keeping their declaration order.
pub fn project_menus(extension_id: Uuid, menus: &[MenuDeclaration]) -> Vec<NewMenuItem> {
    menus
        .iter()
        .enumerate()
        .map(|(index, menu)| NewMenuItem {
            extension_id,
            label: menu.label.clone(),
            path: menu.path.clone(),
            icon: menu.icon.clone(),
            sort_order: menu
                .order
                .filter(|order| *order != 0)
                .unwrap_or(UNORDERED_MENU_BASE + index as i32),
            is_active: true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu(label: &str, order: Option<i32>) -> MenuDeclaration {
        MenuDeclaration {
            label: label.to_string(),
            path: format!("/{label}"),
            icon: None,
            order,
        }
    }

    #[test]
    fn test_menu_order_defaults() {
        let id = Uuid::new_v4();
        let rows = project_menus(id, &[menu("a", Some(3)), menu("b", None), menu("c", Some(0))]);
        let orders: Vec<i32> = rows.iter().map(|r| r.sort_order).collect();
        assert_eq!(orders, vec![3, 100, 101]);
    }

    #[test]
    fn test_route_auth_defaults_to_required() {
        let id = Uuid::new_v4();
        let routes = vec![
            RouteDeclaration {
                path: "/a".into(),
                component: Some("demo:A".into()),
                name: None,
                icon: None,
                requires_auth: None,
                permissions: None,
            },
            RouteDeclaration {
                path: "/b".into(),
                component: None,
                name: None,
                icon: None,
                requires_auth: Some(false),
                permissions: Some(vec!["demo.view".into()]),
            },
        ];
        let rows = project_routes(id, &routes);
        assert!(rows[0].requires_auth);
        assert!(rows[0].required_permissions.is_empty());
        assert!(!rows[1].requires_auth);
        assert_eq!(rows[1].required_permissions, vec!["demo.view"]);
        assert!(rows.iter().all(|r| r.is_active && r.extension_id == id));
    }
}
