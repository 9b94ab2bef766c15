//! Backup plugin module: exports, registration and tenant lifecycle.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use awcms_database::repositories::RegistryRepository;
use awcms_entity::registry::CorePermission;
use awcms_plugin::hooks::names;
use awcms_plugin::prelude::*;

use crate::components::{BackupManager, BackupScheduler, BackupSettings};
use crate::hooks::{self, NAMESPACE};

/// Registry slug of the plugin.
pub const SLUG: &str = "backup";

const MANIFEST_JSON: &str = include_str!("../plugin.json");

/// The bundled manifest.
pub fn manifest() -> Result<PluginManifest, ExtensionError> {
    PluginManifest::from_json(MANIFEST_JSON)
}

/// Builds the plugin module.
pub fn module() -> Result<ExtensionModule, ExtensionError> {
    let manifest = Arc::new(manifest()?);

    let on_register = manifest.clone();
    let on_activate = manifest.clone();
    let on_deactivate = manifest.clone();

    Ok(ExtensionModule::new()
        .with_manifest((*manifest).clone())
        .with_component(Arc::new(BackupManager))
        .with_component(Arc::new(BackupScheduler))
        .with_component(Arc::new(BackupSettings))
        .with_default(Arc::new(BackupManager))
        .on_register(move |ctx| register(ctx, on_register.clone()))
        .on_activate(move |services, tenant| activate(services, tenant, on_activate.clone()))
        .on_deactivate(move |_, tenant| deactivate(tenant, on_deactivate.clone())))
}

async fn register(ctx: RegisterContext, manifest: Arc<PluginManifest>) -> Result<(), ExtensionError> {
    ctx.add_filter(names::ADMIN_MENU_ITEMS, NAMESPACE, hooks::menu_items(manifest.clone()));
    ctx.add_filter(names::ADMIN_ROUTES, NAMESPACE, hooks::admin_routes(manifest.clone()));
    ctx.add_action(names::PLUGINS_LOADED, "backup_init", hooks::on_plugins_loaded(manifest));
    Ok(())
}

/// Registers the plugin's permissions in the core permission table.
async fn activate(
    services: HostServices,
    tenant_id: Uuid,
    manifest: Arc<PluginManifest>,
) -> Result<(), ExtensionError> {
    let Some(database) = services.database() else {
        warn!(tenant_id = %tenant_id, "No database available, skipping backup permission registration");
        return Ok(());
    };

    let repo = RegistryRepository::new(database.pool().clone());
    for name in manifest.declares.permissions.iter().flatten() {
        let permission = CorePermission {
            name: name.clone(),
            resource: SLUG.to_string(),
            action: name.rsplit('.').next().unwrap_or("view").to_string(),
            description: Some(format!("Permission for {}", manifest.name)),
        };
        match repo.upsert_core_permission(&permission).await {
            Ok(()) => {}
            Err(e) if e.is_conflict() => {}
            Err(e) => return Err(ExtensionError::Store(e)),
        }
    }

    info!(plugin = %manifest.name, tenant_id = %tenant_id, "Backup plugin activated");
    Ok(())
}

/// Backup data is kept on deactivation.
async fn deactivate(tenant_id: Uuid, manifest: Arc<PluginManifest>) -> Result<(), ExtensionError> {
    info!(plugin = %manifest.name, tenant_id = %tenant_id, "Backup plugin deactivated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use awcms_plugin::registry::PluginRegistry;

    use super::*;

    #[test]
    fn test_manifest_declares_permissions() {
        let manifest = manifest().unwrap();
        assert_eq!(manifest.slug, SLUG);
        assert_eq!(manifest.declares.routes.as_ref().map(Vec::len), Some(3));
        assert!(
            manifest
                .declares
                .permissions
                .unwrap()
                .contains(&"plugin.backup.view".to_string())
        );
    }

    #[test]
    fn test_registry_resolves_backup_components() {
        let registry = PluginRegistry::new().with_plugin(SLUG, module().unwrap());
        let html = registry.get_extension_component("BackupScheduler").render(&json!({}));
        assert!(html.contains("Backup Schedule"));
        assert_eq!(
            registry.available_components(),
            vec!["backup:BackupManager", "backup:BackupScheduler", "backup:BackupSettings"]
        );
        let lifecycle = registry.get_plugin_lifecycle(SLUG);
        assert!(lifecycle.has_register && lifecycle.has_activate && lifecycle.has_deactivate);
    }

    #[tokio::test]
    async fn test_register_contributes_menu_and_routes() {
        let hooks = std::sync::Arc::new(HookBus::new());
        let ctx = RegisterContext::new(SLUG, hooks.clone(), HostServices::new(), json!({}));
        assert!(module().unwrap().run_register(ctx).await.unwrap());

        let menu = hooks.apply_filters(names::ADMIN_MENU_ITEMS, json!([]), &[]);
        assert_eq!(menu[0]["path"], "/cmspanel/backups");
        let routes = hooks.apply_filters(names::ADMIN_ROUTES, json!([]), &[]);
        assert_eq!(routes.as_array().unwrap().len(), 3);
        assert!(hooks.do_action(names::PLUGINS_LOADED, &[]).is_empty());
    }

    #[tokio::test]
    async fn test_activate_without_database_is_noop() {
        let module = module().unwrap();
        assert!(module.run_activate(HostServices::new(), Uuid::new_v4()).await.unwrap());
    }
}
