//! External extensions: manifests, module resolution and the cached loader.

pub mod loader;
pub mod manifest;
pub mod resolver;

pub use loader::{ExternalExtensionLoader, LoadedExtension};
pub use manifest::{
    ExtensionManifest, ManifestValidation, cache_key, extension_path, is_compatible,
    validate_manifest,
};
pub use resolver::{ModuleFactory, ModuleResolver, StaticModuleResolver};

#[cfg(feature = "dynamic")]
pub use resolver::native::NativeModuleResolver;
