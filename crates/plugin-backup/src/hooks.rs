//! Hook callbacks the backup plugin wires at registration.

use std::sync::Arc;

use tracing::info;

use awcms_plugin::prelude::*;

/// Namespace of the backup filters.
pub const NAMESPACE: &str = "backup_plugin";

/// Permission required to see the backup screens.
pub const VIEW_PERMISSION: &str = "plugin.backup.view";

/// Appends the backup sidebar entries.
pub fn menu_items(manifest: Arc<PluginManifest>) -> impl Fn(&Value, &[Value]) -> Result<Value, ExtensionError> {
    move |items, _| {
        let mut items = as_list(items);
        for menu in manifest.declares.menus.iter().flatten() {
            items.push(json!({
                "id": manifest.slug,
                "label": menu.label,
                "icon": menu.icon,
                "path": menu.path,
                "order": menu.order.unwrap_or(100),
                "permission": VIEW_PERMISSION,
            }));
        }
        Ok(Value::Array(items))
    }
}

/// Appends the backup admin routes, each pointing at a namespaced component key.
pub fn admin_routes(manifest: Arc<PluginManifest>) -> impl Fn(&Value, &[Value]) -> Result<Value, ExtensionError> {
    move |routes, _| {
        let mut routes = as_list(routes);
        for route in manifest.declares.routes.iter().flatten() {
            let component = route
                .component
                .as_deref()
                .map(|c| format!("{}:{c}", manifest.slug));
            let permission = route
                .permissions
                .as_ref()
                .and_then(|p| p.first())
                .map(String::as_str)
                .unwrap_or(VIEW_PERMISSION);
            routes.push(json!({
                "path": route.path,
                "name": route.name,
                "component": component,
                "permission": permission,
            }));
        }
        Ok(Value::Array(routes))
    }
}

/// Logs that the plugin is live once every plugin has loaded.
pub fn on_plugins_loaded(manifest: Arc<PluginManifest>) -> impl Fn(&[Value]) -> Result<(), ExtensionError> {
    move |_| {
        info!(plugin = %manifest.name, version = %manifest.version, "Backup plugin loaded");
        Ok(())
    }
}

fn as_list(value: &Value) -> Vec<Value> {
    value.as_array().cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::manifest;

    #[test]
    fn test_menu_items_appends_entry() {
        let filter = menu_items(Arc::new(manifest().unwrap()));
        let items = filter(&json!([{ "id": "dashboard" }]), &[]).unwrap();
        let items = items.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["id"], "backup");
        assert_eq!(items[1]["permission"], VIEW_PERMISSION);
    }

    #[test]
    fn test_routes_use_namespaced_components() {
        let filter = admin_routes(Arc::new(manifest().unwrap()));
        let routes = filter(&json!([]), &[]).unwrap();
        let components: Vec<&str> = routes
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["component"].as_str().unwrap())
            .collect();
        assert_eq!(
            components,
            vec!["backup:BackupManager", "backup:BackupScheduler", "backup:BackupSettings"]
        );
        assert_eq!(routes[2]["permission"], "plugin.backup.manage");
    }
}
