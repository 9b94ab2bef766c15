//! Hello World sample plugin.
//!
//! Adds a greeting widget to the dashboard and a sidebar entry. Its default
//! export doubles as the component behind the legacy `HelloWorld` key.

use std::sync::Arc;

use tracing::info;

use awcms_plugin::hooks::names;
use awcms_plugin::prelude::*;

/// Registry slug of the plugin.
pub const SLUG: &str = "helloworld";

/// Dashboard greeting card.
#[derive(Debug, Default)]
pub struct HelloWorldWidget;

impl Component for HelloWorldWidget {
    fn name(&self) -> &str {
        "HelloWorld"
    }

    fn render(&self, props: &Value) -> String {
        let who = props["name"].as_str().unwrap_or("Plugin");
        format!(
            r#"<div class="card hello-world"><h3>Hello from {}!</h3><p>This widget was contributed through the dashboard_widgets filter.</p></div>"#,
            escape_html(who)
        )
    }
}

/// The plugin manifest.
pub fn manifest() -> PluginManifest {
    PluginManifest {
        name: "Hello World".to_string(),
        slug: SLUG.to_string(),
        version: "1.0.0".to_string(),
        description: Some("Sample plugin demonstrating hooks and filters".to_string()),
        author: Some("AWCMS Team".to_string()),
        declares: Default::default(),
    }
}

/// Builds the plugin module.
pub fn module() -> ExtensionModule {
    ExtensionModule::new()
        .with_manifest(manifest())
        .with_default(Arc::new(HelloWorldWidget))
        .on_register(register)
}

async fn register(ctx: RegisterContext) -> Result<(), ExtensionError> {
    info!(slug = ctx.slug(), "Hello World plugin registered");

    ctx.add_filter(names::DASHBOARD_WIDGETS, "hello_world_widget", |widgets, _| {
        let mut widgets = widgets.as_array().cloned().unwrap_or_default();
        widgets.push(json!(SLUG));
        Ok(Value::Array(widgets))
    });

    ctx.add_filter(names::ADMIN_MENU_ITEMS, "hello_world_menu", |items, _| {
        let mut items = items.as_array().cloned().unwrap_or_default();
        items.push(json!({
            "id": "hello_world",
            "label": "Hello Plugin",
            "path": "hello-world",
            "icon": "star",
            "group_label": "Plugins",
        }));
        Ok(Value::Array(items))
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use awcms_plugin::context::PluginSlot;
    use awcms_plugin::registry::PluginRegistry;

    use super::*;

    #[tokio::test]
    async fn test_widget_renders_in_dashboard_slot() {
        let registry = PluginRegistry::new().with_plugin(SLUG, module());
        let hooks = Arc::new(HookBus::new());
        let ctx = RegisterContext::new(SLUG, hooks.clone(), HostServices::new(), json!({}));
        module().run_register(ctx).await.unwrap();

        let html = PluginSlot::new(names::DASHBOARD_WIDGETS)
            .with_props(json!({ "name": "AWCMS" }))
            .render_with(&hooks, &registry);
        assert!(html.contains("Hello from AWCMS!"));
    }

    #[test]
    fn test_legacy_key_resolves_default_export() {
        let registry = PluginRegistry::new().with_plugin(SLUG, module());
        let html = registry.get_extension_component("HelloWorld").render(&json!({}));
        assert!(html.contains("Hello from Plugin!"));
    }
}
