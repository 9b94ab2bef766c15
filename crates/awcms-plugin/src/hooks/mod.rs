//! Hook bus: named actions and filters with priority-ordered callbacks.

pub mod bus;
pub mod definitions;
pub mod registry;

pub use bus::HookBus;
pub use definitions::{ActionCallback, DEFAULT_PRIORITY, FilterCallback, HookEntry, names};
pub use registry::HookRegistry;
