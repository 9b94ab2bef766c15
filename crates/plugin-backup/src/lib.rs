//! Backup management plugin for AWCMS.
//!
//! Contributes the backup admin screens, a sidebar menu entry and the
//! backup routes, and registers the backup permissions on activation.

pub mod components;
pub mod hooks;
pub mod plugin;

pub use plugin::{SLUG, manifest, module};
