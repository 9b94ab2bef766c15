//! Renderable components exposed by plugins.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// A renderable unit exported by a plugin.
///
/// Components render to an HTML fragment from a JSON props object.
pub trait Component: Send + Sync + fmt::Debug {
    /// Component name, unique within its plugin.
    fn name(&self) -> &str;

    /// Renders the component.
    fn render(&self, props: &Value) -> String;
}

/// Shared handle to a component.
pub type ComponentRef = Arc<dyn Component>;

type RenderFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// A component backed by a closure.
#[derive(Clone)]
pub struct FnComponent {
    name: String,
    render: RenderFn,
}

impl FnComponent {
    /// Wraps a render closure.
    pub fn new<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            render: Arc::new(render),
        }
    }

    /// Wraps the closure into a shared component handle.
    pub fn shared<F>(name: impl Into<String>, render: F) -> ComponentRef
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        Arc::new(Self::new(name, render))
    }
}

impl fmt::Debug for FnComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnComponent").field("name", &self.name).finish()
    }
}

impl Component for FnComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, props: &Value) -> String {
        (self.render)(props)
    }
}

/// Rendered in place of a component key that resolves to nothing.
#[derive(Debug, Clone)]
pub struct NotFoundComponent {
    key: String,
}

impl NotFoundComponent {
    /// Creates a placeholder for `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// The key that failed to resolve.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Component for NotFoundComponent {
    fn name(&self) -> &str {
        "NotFound"
    }

    fn render(&self, _props: &Value) -> String {
        format!(
            r#"<div class="plugin-not-found">Plugin component "{}" not found.</div>"#,
            escape_html(&self.key)
        )
    }
}

/// Rendered in place of an external extension that failed to load.
#[derive(Debug, Clone)]
pub struct ExtensionErrorComponent {
    extension: String,
    message: String,
}

impl ExtensionErrorComponent {
    /// Creates an error placeholder.
    pub fn new(extension: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            message: message.into(),
        }
    }

    /// The failure message shown to the user.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Component for ExtensionErrorComponent {
    fn name(&self) -> &str {
        "ExtensionError"
    }

    fn render(&self, _props: &Value) -> String {
        format!(
            r#"<div class="extension-error"><h3>Failed to load extension: {}</h3><p>{}</p></div>"#,
            escape_html(&self.extension),
            escape_html(&self.message)
        )
    }
}

/// Escapes text for inclusion in HTML element content or attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_not_found_names_key() {
        let html = NotFoundComponent::new("backup:Nope").render(&json!({}));
        assert!(html.contains(r#"Plugin component "backup:Nope" not found."#), "{html}");
    }

    #[test]
    fn test_error_component_escapes() {
        let html = ExtensionErrorComponent::new("<evil>", "a & b").render(&Value::Null);
        assert!(html.contains("Failed to load extension: &lt;evil&gt;"));
        assert!(html.contains("a &amp; b"));
    }

    #[test]
    fn test_fn_component_uses_props() {
        let c = FnComponent::new("Hi", |props| format!("hi {}", props["who"].as_str().unwrap_or("?")));
        assert_eq!(c.render(&json!({ "who": "there" })), "hi there");
        assert_eq!(c.name(), "Hi");
    }
}
