//! External loader caching and coalescing.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use awcms_plugin::component::FnComponent;
use awcms_plugin::external::{
    ExtensionManifest, ExternalExtensionLoader, ModuleResolver, extension_path, validate_manifest,
};
use awcms_plugin::{ExtensionError, ExtensionModule};

#[derive(Debug, Default)]
struct CountingResolver {
    calls: AtomicUsize,
    fail_first: bool,
}

#[async_trait]
impl ModuleResolver for CountingResolver {
    async fn resolve(
        &self,
        path: &str,
        _manifest: &ExtensionManifest,
    ) -> Result<ExtensionModule, ExtensionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        if self.fail_first && call == 0 {
            return Err(ExtensionError::ModuleNotFound { path: path.to_string() });
        }
        Ok(ExtensionModule::new().with_default(FnComponent::shared("Widget", |_| "<w/>".into())))
    }
}

fn manifest() -> ExtensionManifest {
    ExtensionManifest::new("Widgets", "widgets", "acme", "1.0.0").with_entry("dist/main.js")
}

#[test]
fn test_manifest_validation_examples() {
    let empty: ExtensionManifest = serde_json::from_str("{}").unwrap();
    let result = validate_manifest(&empty);
    assert!(!result.valid);
    assert_eq!(result.errors.len(), 5);

    let full = ExtensionManifest::new("x", "y", "z", "1.2.3");
    let result = validate_manifest(&full);
    assert!(result.valid);
    assert!(result.errors.is_empty());
}

#[test]
fn test_path_derivation() {
    assert_eq!(extension_path(&manifest(), "/ext"), "/ext/awcms-ext-acme-widgets/dist/main.js");
}

#[tokio::test]
async fn test_second_load_returns_cached_reference() {
    let resolver = Arc::new(CountingResolver::default());
    let loader = ExternalExtensionLoader::new("/ext", resolver.clone());

    let first = loader.load_external_extension(&manifest()).await;
    let second = loader.load_external_extension(&manifest()).await;

    assert!(first.loaded);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_loads_resolve_once() {
    let resolver = Arc::new(CountingResolver::default());
    let loader = Arc::new(ExternalExtensionLoader::new("/ext", resolver.clone()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let loader = loader.clone();
            tokio::spawn(async move { loader.load_external_extension(&manifest()).await })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
}

#[tokio::test]
async fn test_failures_are_retried() {
    let resolver = Arc::new(CountingResolver {
        fail_first: true,
        ..CountingResolver::default()
    });
    let loader = ExternalExtensionLoader::new("/ext", resolver.clone());

    let first = loader.load_external_extension(&manifest()).await;
    assert!(!first.loaded);
    assert!(first.error.as_deref().unwrap().contains("/ext/awcms-ext-acme-widgets/dist/main.js"));
    assert!(!loader.is_cached("acme", "widgets"));

    let second = loader.load_external_extension(&manifest()).await;
    assert!(second.loaded);
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_invalid_manifest_never_reaches_resolver() {
    let resolver = Arc::new(CountingResolver::default());
    let loader = ExternalExtensionLoader::new("/ext", resolver.clone());

    let mut bad = manifest();
    bad.version = "one".into();
    let result = loader.load_external_extension(&bad).await;

    assert!(!result.loaded);
    assert!(result.error.as_deref().unwrap().contains("Invalid version format"));
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
}
