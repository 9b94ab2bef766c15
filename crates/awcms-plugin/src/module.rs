//! Extension modules: what a plugin or external extension exports.
//!
//! A module is an explicit capability record. It may carry named components,
//! a default component, a `register` function that wires hooks, tenant
//! `activate`/`deactivate` callbacks and a bundled manifest.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use awcms_database::DatabasePool;
use awcms_entity::extension::ExtensionConfig;

use crate::component::ComponentRef;
use crate::error::ExtensionError;
use crate::hooks::{DEFAULT_PRIORITY, HookBus};

/// Boxed `register` function.
pub type RegisterFn =
    Arc<dyn Fn(RegisterContext) -> BoxFuture<'static, Result<(), ExtensionError>> + Send + Sync>;

/// Boxed tenant lifecycle callback (`activate` / `deactivate`).
pub type TenantHookFn = Arc<
    dyn Fn(HostServices, Uuid) -> BoxFuture<'static, Result<(), ExtensionError>> + Send + Sync,
>;

/// Manifest shipped with a bundled plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Display name.
    pub name: String,
    /// Registry slug.
    pub slug: String,
    /// Plugin version.
    pub version: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional author.
    #[serde(default)]
    pub author: Option<String>,
    /// Routes, menus and permissions the plugin declares.
    #[serde(flatten)]
    pub declares: ExtensionConfig,
}

impl PluginManifest {
    /// Parses a manifest from JSON text.
    pub fn from_json(source: &str) -> Result<Self, ExtensionError> {
        Ok(serde_json::from_str(source)?)
    }
}

/// Services the host hands to plugins.
#[derive(Clone, Default)]
pub struct HostServices {
    database: Option<DatabasePool>,
}

impl HostServices {
    /// Services without a database, used by tests and dry runs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the database pool.
    pub fn with_database(mut self, database: DatabasePool) -> Self {
        self.database = Some(database);
        self
    }

    /// The database pool, if the host has one.
    pub fn database(&self) -> Option<&DatabasePool> {
        self.database.as_ref()
    }
}

impl fmt::Debug for HostServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostServices")
            .field("database", &self.database.is_some())
            .finish()
    }
}

/// Argument handed to a module's `register` function.
#[derive(Clone)]
pub struct RegisterContext {
    slug: String,
    hooks: Arc<HookBus>,
    services: HostServices,
    plugin_config: Value,
}

impl RegisterContext {
    /// Creates a register context for `slug`.
    pub fn new(
        slug: impl Into<String>,
        hooks: Arc<HookBus>,
        services: HostServices,
        plugin_config: Value,
    ) -> Self {
        Self {
            slug: slug.into(),
            hooks,
            services,
            plugin_config,
        }
    }

    /// Slug of the plugin being registered.
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// The shared hook bus.
    pub fn hooks(&self) -> &Arc<HookBus> {
        &self.hooks
    }

    /// Host services.
    pub fn services(&self) -> &HostServices {
        &self.services
    }

    /// The extension row's configuration object (`{}` when unset).
    pub fn plugin_config(&self) -> &Value {
        &self.plugin_config
    }

    /// Registers an action at the default priority.
    pub fn add_action<F>(&self, hook: &str, namespace: &str, callback: F)
    where
        F: Fn(&[Value]) -> Result<(), ExtensionError> + Send + Sync + 'static,
    {
        self.hooks
            .add_action_with_priority(hook, namespace, DEFAULT_PRIORITY, callback);
    }

    /// Registers a filter at the default priority.
    pub fn add_filter<F>(&self, hook: &str, namespace: &str, callback: F)
    where
        F: Fn(&Value, &[Value]) -> Result<Value, ExtensionError> + Send + Sync + 'static,
    {
        self.hooks
            .add_filter_with_priority(hook, namespace, DEFAULT_PRIORITY, callback);
    }

    /// Registers a filter at a chosen priority.
    pub fn add_filter_with_priority<F>(&self, hook: &str, namespace: &str, priority: i32, callback: F)
    where
        F: Fn(&Value, &[Value]) -> Result<Value, ExtensionError> + Send + Sync + 'static,
    {
        self.hooks
            .add_filter_with_priority(hook, namespace, priority, callback);
    }
}

impl fmt::Debug for RegisterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterContext")
            .field("slug", &self.slug)
            .field("services", &self.services)
            .finish()
    }
}

/// The exports of a plugin or external extension.
#[derive(Clone, Default)]
pub struct ExtensionModule {
    manifest: Option<PluginManifest>,
    components: BTreeMap<String, ComponentRef>,
    default_component: Option<ComponentRef>,
    register: Option<RegisterFn>,
    activate: Option<TenantHookFn>,
    deactivate: Option<TenantHookFn>,
}

impl ExtensionModule {
    /// Creates a module with no exports.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the bundled manifest.
    pub fn with_manifest(mut self, manifest: PluginManifest) -> Self {
        self.manifest = Some(manifest);
        self
    }

    /// Export a named component.
    pub fn with_component(mut self, component: ComponentRef) -> Self {
        self.components
            .insert(component.name().to_string(), component);
        self
    }

    /// Export the default component.
    pub fn with_default(mut self, component: ComponentRef) -> Self {
        self.default_component = Some(component);
        self
    }

    /// Export a `register` function.
    pub fn on_register<F, Fut>(mut self, register: F) -> Self
    where
        F: Fn(RegisterContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ExtensionError>> + Send + 'static,
    {
        self.register = Some(Arc::new(move |ctx| Box::pin(register(ctx))));
        self
    }

    /// Export a tenant `activate` callback.
    pub fn on_activate<F, Fut>(mut self, activate: F) -> Self
    where
        F: Fn(HostServices, Uuid) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ExtensionError>> + Send + 'static,
    {
        self.activate = Some(Arc::new(move |services, tenant| {
            Box::pin(activate(services, tenant))
        }));
        self
    }

    /// Export a tenant `deactivate` callback.
    pub fn on_deactivate<F, Fut>(mut self, deactivate: F) -> Self
    where
        F: Fn(HostServices, Uuid) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ExtensionError>> + Send + 'static,
    {
        self.deactivate = Some(Arc::new(move |services, tenant| {
            Box::pin(deactivate(services, tenant))
        }));
        self
    }

    /// The bundled manifest.
    pub fn manifest(&self) -> Option<&PluginManifest> {
        self.manifest.as_ref()
    }

    /// A named component.
    pub fn component(&self, name: &str) -> Option<ComponentRef> {
        self.components.get(name).cloned()
    }

    /// Names of the exported components, sorted.
    pub fn component_names(&self) -> Vec<String> {
        self.components.keys().cloned().collect()
    }

    /// The default component.
    pub fn default_component(&self) -> Option<ComponentRef> {
        self.default_component.clone()
    }

    /// Whether a `register` function is exported.
    pub fn has_register(&self) -> bool {
        self.register.is_some()
    }

    /// Whether an `activate` callback is exported.
    pub fn has_activate(&self) -> bool {
        self.activate.is_some()
    }

    /// Whether a `deactivate` callback is exported.
    pub fn has_deactivate(&self) -> bool {
        self.deactivate.is_some()
    }

    /// Checks the module can be mounted: it needs a default component or a
    /// register function.
    pub fn validate(&self, name: &str) -> Result<(), ExtensionError> {
        if self.default_component.is_none() && self.register.is_none() {
            return Err(ExtensionError::MissingCapability {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Runs `register`. Returns `false` when the module exports none.
    pub async fn run_register(&self, ctx: RegisterContext) -> Result<bool, ExtensionError> {
        match &self.register {
            Some(register) => register(ctx).await.map(|_| true),
            None => Ok(false),
        }
    }

    /// Runs `activate` for a tenant. Returns `false` when the module exports none.
    pub async fn run_activate(
        &self,
        services: HostServices,
        tenant_id: Uuid,
    ) -> Result<bool, ExtensionError> {
        match &self.activate {
            Some(activate) => activate(services, tenant_id).await.map(|_| true),
            None => Ok(false),
        }
    }

    /// Runs `deactivate` for a tenant. Returns `false` when the module exports none.
    pub async fn run_deactivate(
        &self,
        services: HostServices,
        tenant_id: Uuid,
    ) -> Result<bool, ExtensionError> {
        match &self.deactivate {
            Some(deactivate) => deactivate(services, tenant_id).await.map(|_| true),
            None => Ok(false),
        }
    }
}

impl fmt::Debug for ExtensionModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionModule")
            .field("manifest", &self.manifest.as_ref().map(|m| &m.slug))
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .field("has_default", &self.default_component.is_some())
            .field("has_register", &self.register.is_some())
            .field("has_activate", &self.activate.is_some())
            .field("has_deactivate", &self.deactivate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::component::FnComponent;

    #[test]
    fn test_validate_requires_default_or_register() {
        let empty = ExtensionModule::new();
        assert!(matches!(
            empty.validate("x"),
            Err(ExtensionError::MissingCapability { .. })
        ));

        let with_default = ExtensionModule::new().with_default(FnComponent::shared("X", |_| String::new()));
        assert!(with_default.validate("x").is_ok());

        let with_register = ExtensionModule::new().on_register(|_| async { Ok(()) });
        assert!(with_register.validate("x").is_ok());
    }

    #[tokio::test]
    async fn test_run_register_adds_hooks() {
        let module = ExtensionModule::new().on_register(|ctx: RegisterContext| async move {
            let greeting = ctx.plugin_config()["greeting"].as_str().unwrap_or("hi").to_string();
            ctx.add_filter("greet", ctx.slug(), move |_, _| Ok(json!(greeting.clone())));
            Ok(())
        });

        let hooks = Arc::new(HookBus::new());
        let ctx = RegisterContext::new("demo", hooks.clone(), HostServices::new(), json!({ "greeting": "hey" }));
        assert!(module.run_register(ctx).await.unwrap());
        assert_eq!(hooks.apply_filters("greet", Value::Null, &[]), json!("hey"));

        assert!(!module.run_activate(HostServices::new(), Uuid::new_v4()).await.unwrap());
    }

    #[test]
    fn test_manifest_flattens_declarations() {
        let manifest = PluginManifest::from_json(
            r#"{"name":"Demo","slug":"demo","version":"1.0.0","permissions":["demo.view"]}"#,
        )
        .unwrap();
        assert_eq!(manifest.declares.permissions, Some(vec!["demo.view".to_string()]));
        assert!(manifest.declares.routes.is_none());
    }
}
