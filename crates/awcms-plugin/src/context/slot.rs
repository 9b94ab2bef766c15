//! Named filter slots rendered from contributed components.

use serde_json::{Map, Value};
use tracing::debug;

use crate::hooks::HookBus;
use crate::registry::PluginRegistry;

use super::plugin_context::PluginContext;

/// A filter used as a render slot.
///
/// Rendering applies the filter to an empty list. Each resulting item is a
/// component key, or an object `{ "component": key, "props": {...} }` whose
/// props are merged over the slot props. Items resolve through the plugin
/// registry. An empty or non-list result renders the fallback.
#[derive(Debug, Clone)]
pub struct PluginSlot {
    name: String,
    props: Value,
    fallback: Option<String>,
}

/// Alias kept for hosts that call slots "plugin actions".
pub type PluginAction = PluginSlot;

impl PluginSlot {
    /// A slot over the filter `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            props: Value::Object(Map::new()),
            fallback: None,
        }
    }

    /// Props passed to every rendered component.
    pub fn with_props(mut self, props: Value) -> Self {
        self.props = props;
        self
    }

    /// Markup rendered when nothing is contributed.
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    /// The filter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders against a booted context.
    pub fn render(&self, ctx: &PluginContext) -> String {
        self.render_with(ctx.hooks(), ctx.registry())
    }

    /// Renders against an explicit hook bus and registry.
    pub fn render_with(&self, hooks: &HookBus, registry: &PluginRegistry) -> String {
        let contributed = hooks.apply_filters(&self.name, Value::Array(Vec::new()), &[]);
        let items = match contributed {
            Value::Array(items) if !items.is_empty() => items,
            _ => return self.fallback.clone().unwrap_or_default(),
        };

        items
            .iter()
            .filter_map(|item| self.resolve(item))
            .map(|(key, props)| registry.get_plugin_component(&key).render(&props))
            .collect()
    }

    fn resolve(&self, item: &Value) -> Option<(String, Value)> {
        match item {
            Value::String(key) => Some((key.clone(), self.props.clone())),
            Value::Object(fields) => {
                let Some(key) = fields.get("component").and_then(Value::as_str) else {
                    debug!(slot = %self.name, "Slot item without component key skipped");
                    return None;
                };
                let props = merge_props(&self.props, fields.get("props"));
                Some((key.to_string(), props))
            }
            _ => {
                debug!(slot = %self.name, "Unsupported slot item skipped");
                None
            }
        }
    }
}

fn merge_props(base: &Value, overlay: Option<&Value>) -> Value {
    let mut merged = match base {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    if let Some(Value::Object(extra)) = overlay {
        for (k, v) in extra {
            merged.insert(k.clone(), v.clone());
        }
    }
    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::component::FnComponent;
    use crate::module::ExtensionModule;

    fn registry() -> PluginRegistry {
        PluginRegistry::new().with_plugin(
            "stats",
            ExtensionModule::new().with_component(FnComponent::shared("Visits", |props| {
                format!(
                    "<visits range={} title={}>",
                    props["range"].as_str().unwrap_or("-"),
                    props["title"].as_str().unwrap_or("-")
                )
            })),
        )
    }

    #[test]
    fn test_empty_slot_renders_fallback() {
        let hooks = HookBus::new();
        let slot = PluginSlot::new("dashboard_widgets").with_fallback("<empty/>");
        assert_eq!(slot.render_with(&hooks, &registry()), "<empty/>");
        assert_eq!(PluginSlot::new("x").render_with(&hooks, &registry()), "");
    }

    #[test]
    fn test_non_list_result_renders_fallback() {
        let hooks = HookBus::new();
        hooks.add_filter("dashboard_widgets", "bad", |_, _| Ok(json!("oops")));
        let slot = PluginSlot::new("dashboard_widgets").with_fallback("none");
        assert_eq!(slot.render_with(&hooks, &registry()), "none");
    }

    #[test]
    fn test_items_render_with_merged_props() {
        let hooks = HookBus::new();
        hooks.add_filter("dashboard_widgets", "stats", |value, _| {
            let mut items = value.as_array().cloned().unwrap_or_default();
            items.push(json!("stats:Visits"));
            items.push(json!({ "component": "stats:Visits", "props": { "range": "30d" } }));
            items.push(json!("missing:Widget"));
            Ok(Value::Array(items))
        });

        let html = PluginSlot::new("dashboard_widgets")
            .with_props(json!({ "range": "7d", "title": "Traffic" }))
            .render_with(&hooks, &registry());

        assert!(html.starts_with("<visits range=7d title=Traffic><visits range=30d title=Traffic>"));
        assert!(html.contains(r#"Plugin component "missing:Widget" not found."#));
    }
}
