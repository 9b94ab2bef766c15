//! The plugin context: composition root of the extension subsystem.
//!
//! At boot the context reads the active extension rows, registers each
//! bundled plugin or external extension against the shared hook bus and
//! fires `plugins_loaded`. One failing extension never blocks the others;
//! failures are logged and kept for an admin-facing health view.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::{OnceCell, RwLock};
use tracing::{error, info, warn};
use uuid::Uuid;

use awcms_entity::extension::Extension;

use crate::component::ComponentRef;
use crate::error::ExtensionError;
use crate::external::{ExtensionManifest, ExternalExtensionLoader, LoadedExtension, is_compatible};
use crate::hooks::bus::panic_message;
use crate::hooks::{HookBus, names};
use crate::module::{ExtensionModule, HostServices, RegisterContext};
use crate::registry::PluginRegistry;

use super::source::ExtensionSource;

/// Stage at which an extension failed during boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BootStage {
    /// Reading the extension rows.
    Fetch,
    /// Building or checking the external manifest.
    Manifest,
    /// Loading the external module.
    Load,
    /// Running `register`.
    Register,
}

/// A failure recorded during boot.
#[derive(Debug, Clone, Serialize)]
pub struct BootFailure {
    /// Extension slug, empty for fetch failures.
    pub slug: String,
    /// Where it failed.
    pub stage: BootStage,
    /// Failure description.
    pub message: String,
}

/// Counts passed to `plugins_loaded`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BootSummary {
    /// Core rows processed.
    pub core: usize,
    /// External extensions loaded.
    pub external: usize,
    /// Plugins whose `register` ran.
    pub total: usize,
}

/// An external extension mounted at boot.
#[derive(Debug, Clone)]
pub struct ExternalPlugin {
    /// The extension row.
    pub row: Extension,
    /// The loaded module.
    pub extension: Arc<LoadedExtension>,
}

#[derive(Debug)]
struct BootState {
    is_loading: bool,
    active: Vec<Extension>,
    registered: Vec<String>,
    external: Vec<ExternalPlugin>,
    failures: Vec<BootFailure>,
    summary: BootSummary,
}

impl Default for BootState {
    fn default() -> Self {
        Self {
            is_loading: true,
            active: Vec::new(),
            registered: Vec::new(),
            external: Vec::new(),
            failures: Vec::new(),
            summary: BootSummary::default(),
        }
    }
}

/// Shared extension context handed to the rest of the host.
pub struct PluginContext {
    hooks: Arc<HookBus>,
    registry: Arc<PluginRegistry>,
    loader: Arc<ExternalExtensionLoader>,
    source: Arc<dyn ExtensionSource>,
    services: HostServices,
    host_version: String,
    state: RwLock<BootState>,
    booted: OnceCell<BootSummary>,
}

impl PluginContext {
    /// Creates a context with a fresh hook bus.
    pub fn new(
        registry: Arc<PluginRegistry>,
        loader: Arc<ExternalExtensionLoader>,
        source: Arc<dyn ExtensionSource>,
        host_version: impl Into<String>,
    ) -> Self {
        Self {
            hooks: Arc::new(HookBus::new()),
            registry,
            loader,
            source,
            services: HostServices::new(),
            host_version: host_version.into(),
            state: RwLock::new(BootState::default()),
            booted: OnceCell::new(),
        }
    }

    /// Use an existing hook bus.
    pub fn with_hooks(mut self, hooks: Arc<HookBus>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Services passed to `register`, `activate` and `deactivate`.
    pub fn with_services(mut self, services: HostServices) -> Self {
        self.services = services;
        self
    }

    /// Registers every active extension and fires `plugins_loaded`.
    ///
    /// Runs once; concurrent and later calls wait for and return the first
    /// summary. When the rows cannot be fetched, loading finishes without
    /// firing `plugins_loaded`.
    pub async fn boot(&self) -> BootSummary {
        if let Some(summary) = self.booted.get() {
            warn!("Plugin context already booted");
            return *summary;
        }
        *self.booted.get_or_init(|| self.run_boot()).await
    }

    async fn run_boot(&self) -> BootSummary {
        let rows = match self.source.active_extensions().await {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "Failed to load extensions");
                let mut state = self.state.write().await;
                state.failures.push(BootFailure {
                    slug: String::new(),
                    stage: BootStage::Fetch,
                    message: e.to_string(),
                });
                state.is_loading = false;
                return state.summary;
            }
        };

        let (external_rows, core_rows): (Vec<&Extension>, Vec<&Extension>) =
            rows.iter().partition(|row| row.is_external());

        let mut registered = Vec::new();
        let mut external = Vec::new();
        let mut failures = Vec::new();

        for row in &core_rows {
            let slug = row.plugin_slug().to_string();
            match self.register_core(row).await {
                Ok(true) => registered.push(slug),
                Ok(false) => {}
                Err(e) => {
                    error!(slug = %slug, error = %e, "Failed to register plugin");
                    failures.push(BootFailure {
                        slug,
                        stage: BootStage::Register,
                        message: e.to_string(),
                    });
                }
            }
        }

        for row in &external_rows {
            match self.register_external(row).await {
                Ok((extension, did_register)) => {
                    if did_register {
                        registered.push(row.slug.clone());
                    }
                    external.push(ExternalPlugin {
                        row: (*row).clone(),
                        extension,
                    });
                }
                Err((stage, e)) => {
                    error!(slug = %row.slug, error = %e, "Failed to load external extension");
                    failures.push(BootFailure {
                        slug: row.slug.clone(),
                        stage,
                        message: e.to_string(),
                    });
                }
            }
        }

        let summary = BootSummary {
            core: core_rows.len(),
            external: external.len(),
            total: registered.len(),
        };

        info!(
            core = summary.core,
            external = summary.external,
            total = summary.total,
            failed = failures.len(),
            "Plugins loaded"
        );

        {
            let mut state = self.state.write().await;
            state.active = rows.clone();
            state.registered = registered;
            state.external = external;
            state.failures = failures;
            state.summary = summary;
        }

        self.hooks.do_action(
            names::PLUGINS_LOADED,
            &[json!({
                "core": summary.core,
                "external": summary.external,
                "total": summary.total,
            })],
        );

        let mut state = self.state.write().await;
        state.is_loading = false;
        summary
    }

    async fn register_core(&self, row: &Extension) -> Result<bool, ExtensionError> {
        let slug = row.plugin_slug();
        let Some(module) = self.registry.get_plugin(slug) else {
            warn!(slug, extension = %row.name, "Plugin not found in registry");
            return Ok(false);
        };
        self.run_register(slug, &module, row.plugin_config()).await
    }

    async fn register_external(
        &self,
        row: &Extension,
    ) -> Result<(Arc<LoadedExtension>, bool), (BootStage, ExtensionError)> {
        let manifest = ExtensionManifest::for_row(row).map_err(|e| (BootStage::Manifest, e))?;

        if !is_compatible(&manifest, &self.host_version) {
            return Err((
                BootStage::Manifest,
                ExtensionError::Incompatible {
                    name: manifest.name.clone(),
                    required: manifest.awcms_version.clone().unwrap_or_default(),
                    host: self.host_version.clone(),
                },
            ));
        }

        let extension = self.loader.load_external_extension(&manifest).await;
        if !extension.loaded {
            return Err((
                BootStage::Load,
                ExtensionError::Load {
                    name: manifest.name.clone(),
                    message: extension.error.clone().unwrap_or_default(),
                },
            ));
        }

        let did_register = self
            .run_register(&row.slug, &extension.module, row.plugin_config())
            .await
            .map_err(|e| (BootStage::Register, e))?;

        Ok((extension, did_register))
    }

    async fn run_register(
        &self,
        slug: &str,
        module: &ExtensionModule,
        plugin_config: Value,
    ) -> Result<bool, ExtensionError> {
        if !module.has_register() {
            return Ok(false);
        }

        let ctx = RegisterContext::new(slug, self.hooks.clone(), self.services.clone(), plugin_config);
        let outcome = AssertUnwindSafe(module.run_register(ctx)).catch_unwind().await;

        let message = match outcome {
            Ok(Ok(registered)) => {
                info!(slug, "Plugin registered");
                return Ok(registered);
            }
            Ok(Err(e)) => e.to_string(),
            Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
        };
        Err(ExtensionError::Register {
            slug: slug.to_string(),
            message,
        })
    }

    /// Runs a bundled plugin's `activate` for a tenant.
    ///
    /// Returns `false` when the plugin is unknown or exports no `activate`.
    pub async fn activate_plugin(&self, slug: &str, tenant_id: Uuid) -> Result<bool, ExtensionError> {
        let Some(module) = self.registry.get_plugin(slug) else {
            return Ok(false);
        };
        let activated = module.run_activate(self.services.clone(), tenant_id).await?;
        if activated {
            info!(slug, tenant_id = %tenant_id, "Plugin activated");
        }
        Ok(activated)
    }

    /// Runs a bundled plugin's `deactivate` for a tenant.
    ///
    /// Returns `false` when the plugin is unknown or exports no `deactivate`.
    pub async fn deactivate_plugin(&self, slug: &str, tenant_id: Uuid) -> Result<bool, ExtensionError> {
        let Some(module) = self.registry.get_plugin(slug) else {
            return Ok(false);
        };
        let deactivated = module.run_deactivate(self.services.clone(), tenant_id).await?;
        if deactivated {
            info!(slug, tenant_id = %tenant_id, "Plugin deactivated");
        }
        Ok(deactivated)
    }

    /// The shared hook bus.
    pub fn hooks(&self) -> &Arc<HookBus> {
        &self.hooks
    }

    /// The bundled plugin registry.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// The external extension loader.
    pub fn loader(&self) -> &Arc<ExternalExtensionLoader> {
        &self.loader
    }

    /// Host version used for compatibility checks.
    pub fn host_version(&self) -> &str {
        &self.host_version
    }

    /// Whether boot is still in progress (or has not started).
    pub async fn is_loading(&self) -> bool {
        self.state.read().await.is_loading
    }

    /// The extension rows read at boot.
    pub async fn active_extensions(&self) -> Vec<Extension> {
        self.state.read().await.active.clone()
    }

    /// Slugs whose `register` ran, in boot order.
    pub async fn registered_plugins(&self) -> Vec<String> {
        self.state.read().await.registered.clone()
    }

    /// External extensions mounted at boot.
    pub async fn external_extensions(&self) -> Vec<ExternalPlugin> {
        self.state.read().await.external.clone()
    }

    /// Failures recorded during boot.
    pub async fn failures(&self) -> Vec<BootFailure> {
        self.state.read().await.failures.clone()
    }

    /// Resolves a component key through the plugin registry.
    pub fn get_plugin_component(&self, key: &str) -> ComponentRef {
        self.registry.get_plugin_component(key)
    }

    /// See [`HookBus::add_action`].
    pub fn add_action<F>(&self, hook: &str, namespace: &str, callback: F)
    where
        F: Fn(&[Value]) -> Result<(), ExtensionError> + Send + Sync + 'static,
    {
        self.hooks.add_action(hook, namespace, callback);
    }

    /// See [`HookBus::do_action`].
    pub fn do_action(&self, hook: &str, args: &[Value]) -> Vec<ExtensionError> {
        self.hooks.do_action(hook, args)
    }

    /// See [`HookBus::add_filter`].
    pub fn add_filter<F>(&self, hook: &str, namespace: &str, callback: F)
    where
        F: Fn(&Value, &[Value]) -> Result<Value, ExtensionError> + Send + Sync + 'static,
    {
        self.hooks.add_filter(hook, namespace, callback);
    }

    /// See [`HookBus::apply_filters`].
    pub fn apply_filters(&self, hook: &str, value: Value, args: &[Value]) -> Value {
        self.hooks.apply_filters(hook, value, args)
    }

    /// See [`HookBus::remove_action`].
    pub fn remove_action(&self, hook: &str, namespace: &str) -> bool {
        self.hooks.remove_action(hook, namespace)
    }

    /// See [`HookBus::remove_filter`].
    pub fn remove_filter(&self, hook: &str, namespace: &str) -> bool {
        self.hooks.remove_filter(hook, namespace)
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("registry", &self.registry.slugs())
            .field("loader", &self.loader)
            .field("host_version", &self.host_version)
            .finish()
    }
}
