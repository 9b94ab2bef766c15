//! Plugin context: boots active extensions and exposes the hook bus and
//! component lookup to the host.

pub mod plugin_context;
pub mod slot;
pub mod source;

pub use plugin_context::{BootFailure, BootStage, BootSummary, ExternalPlugin, PluginContext};
pub use slot::{PluginAction, PluginSlot};
pub use source::{ExtensionSource, MemoryExtensionSource};
