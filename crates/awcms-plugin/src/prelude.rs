//! Prelude for plugin authors.

pub use crate::component::{Component, ComponentRef, FnComponent, escape_html};
pub use crate::error::ExtensionError;
pub use crate::hooks::{HookBus, names};
pub use crate::module::{ExtensionModule, HostServices, PluginManifest, RegisterContext};

pub use serde_json::{Value, json};
