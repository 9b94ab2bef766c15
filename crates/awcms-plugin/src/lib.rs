//! # awcms-plugin
//!
//! Extension framework for AWCMS. Provides:
//!
//! - A hook bus of named actions and filters with namespaced, priority-ordered
//!   registration and per-callback failure containment
//! - A static registry of bundled plugins and their components
//! - A loader for external extensions with manifest validation, caching and
//!   a pluggable module resolver
//! - Lifecycle sync projecting declared routes, menus and permissions into
//!   the registry tables
//! - The plugin context that wires active extensions into the hook bus at boot

pub mod component;
pub mod context;
pub mod error;
pub mod external;
pub mod hooks;
pub mod lifecycle;
pub mod module;
pub mod prelude;
pub mod registry;

pub use component::{Component, ComponentRef};
pub use context::{PluginContext, PluginSlot};
pub use error::ExtensionError;
pub use external::{ExternalExtensionLoader, ExtensionManifest, LoadedExtension};
pub use hooks::HookBus;
pub use lifecycle::LifecycleSync;
pub use module::{ExtensionModule, HostServices, PluginManifest, RegisterContext};
pub use registry::PluginRegistry;
