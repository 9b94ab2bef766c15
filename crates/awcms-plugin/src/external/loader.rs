//! Cached loader for external extensions.
//!
//! Loads are keyed by `vendor-slug`. A successful load is cached and shared;
//! concurrent loads of the same key share one in-flight attempt. Failures
//! are not cached, so a later call retries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::component::{ComponentRef, ExtensionErrorComponent};
use crate::error::ExtensionError;
use crate::module::ExtensionModule;

use super::manifest::{ExtensionManifest, cache_key, extension_path, validate_manifest};
use super::resolver::ModuleResolver;

/// Result of loading an external extension.
///
/// Failed loads carry a placeholder module whose default component renders
/// the failure.
#[derive(Debug, Clone)]
pub struct LoadedExtension {
    /// The resolved module, or the error placeholder.
    pub module: ExtensionModule,
    /// The manifest the load was attempted with.
    pub manifest: ExtensionManifest,
    /// Whether the module was resolved.
    pub loaded: bool,
    /// When the attempt finished.
    pub loaded_at: DateTime<Utc>,
    /// Failure message when `loaded` is false.
    pub error: Option<String>,
}

impl LoadedExtension {
    fn loaded(module: ExtensionModule, manifest: ExtensionManifest) -> Self {
        Self {
            module,
            manifest,
            loaded: true,
            loaded_at: Utc::now(),
            error: None,
        }
    }

    fn failed(manifest: ExtensionManifest, err: &ExtensionError) -> Self {
        let message = err.to_string();
        let name = if manifest.name.is_empty() {
            manifest.slug.clone()
        } else {
            manifest.name.clone()
        };
        let module = ExtensionModule::new()
            .with_default(Arc::new(ExtensionErrorComponent::new(name, message.clone())));
        Self {
            module,
            manifest,
            loaded: false,
            loaded_at: Utc::now(),
            error: Some(message),
        }
    }

    /// The module's default component.
    pub fn default_component(&self) -> Option<ComponentRef> {
        self.module.default_component()
    }

    /// Cache key of this extension.
    pub fn key(&self) -> String {
        cache_key(&self.manifest.vendor, &self.manifest.slug)
    }
}

/// Loads external extensions through a [`ModuleResolver`].
pub struct ExternalExtensionLoader {
    base_path: String,
    resolver: Arc<dyn ModuleResolver>,
    cache: DashMap<String, Arc<OnceCell<Arc<LoadedExtension>>>>,
}

impl ExternalExtensionLoader {
    /// Creates a loader resolving paths under `base_path`.
    pub fn new(base_path: impl Into<String>, resolver: Arc<dyn ModuleResolver>) -> Self {
        Self {
            base_path: base_path.into(),
            resolver,
            cache: DashMap::new(),
        }
    }

    /// The extension base path.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// The load path for a manifest: `external_path` when set, else the
    /// computed package path.
    pub fn get_extension_path(&self, manifest: &ExtensionManifest) -> String {
        manifest
            .external_path
            .clone()
            .unwrap_or_else(|| extension_path(manifest, &self.base_path))
    }

    /// Loads an extension, returning the cached result when present.
    ///
    /// Never fails: on any error the returned value has `loaded == false`,
    /// an error message and a placeholder default component.
    pub async fn load_external_extension(
        &self,
        manifest: &ExtensionManifest,
    ) -> Arc<LoadedExtension> {
        let key = cache_key(&manifest.vendor, &manifest.slug);
        let cell = self.cache.entry(key.clone()).or_default().value().clone();

        match cell.get_or_try_init(|| self.load(manifest)).await {
            Ok(extension) => extension.clone(),
            Err(e) => {
                error!(extension = %key, error = %e, "Failed to load external extension");
                self.cache
                    .remove_if(&key, |_, c| Arc::ptr_eq(c, &cell) && !c.initialized());
                Arc::new(LoadedExtension::failed(manifest.clone(), &e))
            }
        }
    }

    async fn load(&self, manifest: &ExtensionManifest) -> Result<Arc<LoadedExtension>, ExtensionError> {
        validate_manifest(manifest).into_result()?;

        let path = self.get_extension_path(manifest);
        if path.split('/').any(|segment| segment == "..") {
            return Err(ExtensionError::PathRejected { path });
        }

        let module = self.resolver.resolve(&path, manifest).await?;
        module.validate(&manifest.name)?;

        info!(
            extension = %manifest.name,
            version = %manifest.version,
            path = %path,
            "Loaded external extension"
        );

        Ok(Arc::new(LoadedExtension::loaded(module, manifest.clone())))
    }

    /// Drops a cached extension. Returns whether one was cached.
    pub fn unload_external_extension(&self, vendor: &str, slug: &str) -> bool {
        let removed = self.cache.remove(&cache_key(vendor, slug)).is_some();
        if removed {
            info!(vendor, slug, "Unloaded external extension");
        }
        removed
    }

    /// Drops every cached extension.
    pub fn clear_extension_cache(&self) {
        self.cache.clear();
    }

    /// Whether a successful load is cached for the key.
    pub fn is_cached(&self, vendor: &str, slug: &str) -> bool {
        self.cache
            .get(&cache_key(vendor, slug))
            .is_some_and(|cell| cell.initialized())
    }

    /// All cached successful loads, sorted by key.
    pub fn loaded_extensions(&self) -> Vec<Arc<LoadedExtension>> {
        let mut loaded: Vec<Arc<LoadedExtension>> = self
            .cache
            .iter()
            .filter_map(|entry| entry.value().get().cloned())
            .collect();
        loaded.sort_by_key(|e| e.key());
        loaded
    }
}

impl std::fmt::Debug for ExternalExtensionLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalExtensionLoader")
            .field("base_path", &self.base_path)
            .field("resolver", &self.resolver)
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::component::FnComponent;
    use crate::external::resolver::StaticModuleResolver;

    fn loader() -> ExternalExtensionLoader {
        let resolver = StaticModuleResolver::new()
            .with_module("/ext/awcms-ext-acme-hello/dist/index.js", |_| {
                Ok(ExtensionModule::new().with_default(FnComponent::shared("Hello", |_| "hello".into())))
            })
            .with_module("/ext/awcms-ext-acme-empty/dist/index.js", |_| Ok(ExtensionModule::new()));
        ExternalExtensionLoader::new("/ext", Arc::new(resolver))
    }

    #[tokio::test]
    async fn test_successful_load_is_cached() {
        let loader = loader();
        let manifest = ExtensionManifest::new("Hello", "hello", "acme", "1.0.0");

        let first = loader.load_external_extension(&manifest).await;
        assert!(first.loaded);
        assert!(first.error.is_none());
        assert!(loader.is_cached("acme", "hello"));

        let second = loader.load_external_extension(&manifest).await;
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_invalid_manifest_yields_placeholder() {
        let loader = loader();
        let manifest = ExtensionManifest::default();
        let result = loader.load_external_extension(&manifest).await;

        assert!(!result.loaded);
        assert!(result.error.as_deref().unwrap().contains("Missing required field: name"));
        let html = result.default_component().unwrap().render(&json!({}));
        assert!(html.contains("Failed to load extension"));
        assert!(loader.loaded_extensions().is_empty());
    }

    #[tokio::test]
    async fn test_module_without_capability_fails() {
        let loader = loader();
        let manifest = ExtensionManifest::new("Empty", "empty", "acme", "1.0.0");
        let result = loader.load_external_extension(&manifest).await;
        assert!(!result.loaded);
        assert!(!loader.is_cached("acme", "empty"));
    }

    #[tokio::test]
    async fn test_parent_segments_rejected() {
        let loader = loader();
        let mut manifest = ExtensionManifest::new("Hello", "hello", "acme", "1.0.0");
        manifest.external_path = Some("/ext/../etc/shadow".into());
        let result = loader.load_external_extension(&manifest).await;
        assert!(!result.loaded);
        assert!(result.error.as_deref().unwrap().contains("outside the extension root"));
    }

    #[tokio::test]
    async fn test_unload_and_clear() {
        let loader = loader();
        let manifest = ExtensionManifest::new("Hello", "hello", "acme", "1.0.0");
        let first = loader.load_external_extension(&manifest).await;

        assert!(loader.unload_external_extension("acme", "hello"));
        assert!(!loader.unload_external_extension("acme", "hello"));

        let reloaded = loader.load_external_extension(&manifest).await;
        assert!(!Arc::ptr_eq(&first, &reloaded));
        assert_eq!(loader.loaded_extensions().len(), 1);

        loader.clear_extension_cache();
        assert!(loader.loaded_extensions().is_empty());
    }
}
