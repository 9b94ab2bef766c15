//! Module resolvers turn a load path into an [`ExtensionModule`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::error::ExtensionError;
use crate::module::ExtensionModule;

use super::manifest::ExtensionManifest;

/// Produces the module exported at a load path.
#[async_trait]
pub trait ModuleResolver: Send + Sync + fmt::Debug {
    /// Resolves the module at `path`.
    async fn resolve(
        &self,
        path: &str,
        manifest: &ExtensionManifest,
    ) -> Result<ExtensionModule, ExtensionError>;
}

/// Builds a module for a manifest.
pub type ModuleFactory =
    Arc<dyn Fn(&ExtensionManifest) -> Result<ExtensionModule, ExtensionError> + Send + Sync>;

/// Resolver over an allow-list of load paths registered up front.
///
/// Paths that were never registered resolve to
/// [`ExtensionError::ModuleNotFound`].
#[derive(Default)]
pub struct StaticModuleResolver {
    modules: DashMap<String, ModuleFactory>,
}

impl StaticModuleResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows `path`, building its module with `factory` on each resolve.
    pub fn register<F>(&self, path: impl Into<String>, factory: F)
    where
        F: Fn(&ExtensionManifest) -> Result<ExtensionModule, ExtensionError>
            + Send
            + Sync
            + 'static,
    {
        self.modules.insert(path.into(), Arc::new(factory));
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_module<F>(self, path: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&ExtensionManifest) -> Result<ExtensionModule, ExtensionError>
            + Send
            + Sync
            + 'static,
    {
        self.register(path, factory);
        self
    }

    /// Allowed paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.modules.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }
}

impl fmt::Debug for StaticModuleResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticModuleResolver")
            .field("paths", &self.paths())
            .finish()
    }
}

#[async_trait]
impl ModuleResolver for StaticModuleResolver {
    async fn resolve(
        &self,
        path: &str,
        manifest: &ExtensionManifest,
    ) -> Result<ExtensionModule, ExtensionError> {
        let factory = self
            .modules
            .get(path)
            .map(|f| f.value().clone())
            .ok_or_else(|| ExtensionError::ModuleNotFound {
                path: path.to_string(),
            })?;

        debug!(path, extension = %manifest.slug, "Resolving static extension module");
        factory(manifest)
    }
}

/// Native resolver loading shared libraries with `libloading` (feature-gated).
#[cfg(feature = "dynamic")]
pub mod native {
    use std::path::{Component, Path, PathBuf};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tracing::info;

    use super::{ExtensionManifest, ModuleResolver};
    use crate::error::ExtensionError;
    use crate::module::ExtensionModule;

    /// Symbol every native extension exports.
    pub const ENTRY_SYMBOL: &[u8] = b"awcms_extension_entry";

    /// Type of the entry function exported by native extensions.
    ///
    /// Native extensions must export:
    /// `extern "C" fn awcms_extension_entry() -> *mut ExtensionModule`
    /// built with the same compiler and `awcms-plugin` version as the host.
    pub type ExtensionEntryFn = unsafe extern "C" fn() -> *mut ExtensionModule;

    /// Maps load paths under `base_path` onto shared libraries under `root`.
    pub struct NativeModuleResolver {
        base_path: String,
        root: PathBuf,
        /// Loaded libraries (kept alive for the lifetime of the resolver).
        libraries: Mutex<Vec<libloading::Library>>,
    }

    impl NativeModuleResolver {
        /// Creates a resolver mapping `base_path` to the directory `root`.
        pub fn new(base_path: impl Into<String>, root: impl Into<PathBuf>) -> Self {
            Self {
                base_path: base_path.into(),
                root: root.into(),
                libraries: Mutex::new(Vec::new()),
            }
        }

        /// The file a load path maps to.
        pub fn library_path(&self, path: &str) -> Result<PathBuf, ExtensionError> {
            let rejected = || ExtensionError::PathRejected {
                path: path.to_string(),
            };

            let relative = path
                .strip_prefix(self.base_path.trim_end_matches('/'))
                .and_then(|rest| rest.strip_prefix('/'))
                .ok_or_else(rejected)?;

            let relative = Path::new(relative);
            if !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
            {
                return Err(rejected());
            }

            let is_library = relative
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| matches!(e, "so" | "dylib" | "dll"));
            if !is_library {
                return Err(ExtensionError::ModuleNotFound {
                    path: path.to_string(),
                });
            }

            Ok(self.root.join(relative))
        }

        /// Loads the module from a shared library.
        ///
        /// # Safety
        /// This function loads arbitrary code from a shared library.
        /// Only load trusted extensions.
        unsafe fn load_library(
            &self,
            file: &Path,
            name: &str,
        ) -> Result<ExtensionModule, ExtensionError> {
            let load_error = |message: String| ExtensionError::Load {
                name: name.to_string(),
                message,
            };

            let lib = unsafe { libloading::Library::new(file) }
                .map_err(|e| load_error(format!("'{}': {e}", file.display())))?;

            let module = {
                let entry: libloading::Symbol<ExtensionEntryFn> = unsafe { lib.get(ENTRY_SYMBOL) }
                    .map_err(|e| load_error(format!("missing entry symbol: {e}")))?;

                let raw = unsafe { entry() };
                if raw.is_null() {
                    return Err(load_error("entry returned null".to_string()));
                }
                *unsafe { Box::from_raw(raw) }
            };

            info!(path = %file.display(), extension = name, "Native extension loaded");

            self.libraries
                .lock()
                .map_err(|_| load_error("library table poisoned".to_string()))?
                .push(lib);

            Ok(module)
        }
    }

    impl std::fmt::Debug for NativeModuleResolver {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            let loaded = self.libraries.lock().map(|l| l.len()).unwrap_or(0);
            f.debug_struct("NativeModuleResolver")
                .field("base_path", &self.base_path)
                .field("root", &self.root)
                .field("loaded_count", &loaded)
                .finish()
        }
    }

    #[async_trait]
    impl ModuleResolver for NativeModuleResolver {
        async fn resolve(
            &self,
            path: &str,
            manifest: &ExtensionManifest,
        ) -> Result<ExtensionModule, ExtensionError> {
            let file = self.library_path(path)?;
            if !file.is_file() {
                return Err(ExtensionError::ModuleNotFound {
                    path: path.to_string(),
                });
            }
            unsafe { self.load_library(&file, &manifest.name) }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_library_path_mapping() {
            let resolver = NativeModuleResolver::new("/ext", "/opt/awcms/ext");
            assert_eq!(
                resolver.library_path("/ext/awcms-ext-acme-hello/lib/hello.so").unwrap(),
                PathBuf::from("/opt/awcms/ext/awcms-ext-acme-hello/lib/hello.so")
            );
            assert!(matches!(
                resolver.library_path("/extra/evil.so"),
                Err(ExtensionError::PathRejected { .. })
            ));
            assert!(matches!(
                resolver.library_path("/ext/../etc/evil.so"),
                Err(ExtensionError::PathRejected { .. })
            ));
            assert!(matches!(
                resolver.library_path("/etc/passwd.so"),
                Err(ExtensionError::PathRejected { .. })
            ));
            assert!(matches!(
                resolver.library_path("/ext/awcms-ext-acme-hello/dist/index.js"),
                Err(ExtensionError::ModuleNotFound { .. })
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::FnComponent;

    #[tokio::test]
    async fn test_static_resolver_allow_list() {
        let resolver = StaticModuleResolver::new().with_module("/ext/awcms-ext-acme-a/dist/index.js", |m| {
            let name = m.name.clone();
            Ok(ExtensionModule::new().with_default(FnComponent::shared("A", move |_| name.clone())))
        });
        let manifest = ExtensionManifest::new("Alpha", "a", "acme", "1.0.0");

        let module = resolver
            .resolve("/ext/awcms-ext-acme-a/dist/index.js", &manifest)
            .await
            .unwrap();
        assert!(module.default_component().is_some());

        let missing = resolver.resolve("/ext/awcms-ext-acme-b/dist/index.js", &manifest).await;
        assert!(matches!(missing, Err(ExtensionError::ModuleNotFound { .. })));
    }
}
