//! Extension rows and their declared configuration.

pub mod config;
pub mod model;

pub use config::{ExtensionConfig, MenuDeclaration, RouteDeclaration};
pub use model::{Extension, ExtensionType};
