//! Lifecycle sync: projects an extension's declared routes, menus and
//! permissions into the registry tables and toggles them on (de)activation.

pub mod store;
pub mod sync;

pub use store::{MemoryRegistryStore, RegistryStore, StoreOp};
pub use sync::{LifecycleSync, SyncReport, SyncStep, project_menus, project_routes};
