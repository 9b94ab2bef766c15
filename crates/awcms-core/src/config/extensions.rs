//! Extension host configuration.

use serde::{Deserialize, Serialize};

/// Settings for bundled plugins and externally loaded extensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionsConfig {
    /// Base path external extension bundles are served from.
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Host version compared against a manifest's `awcms_version`.
    #[serde(default = "default_host_version")]
    pub host_version: String,
    /// Filesystem directory that `base_path` maps onto for native bundles.
    #[serde(default = "default_native_root")]
    pub native_root: String,
    /// Whether the host boots the plugin context on startup.
    #[serde(default = "default_true")]
    pub auto_boot: bool,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            host_version: default_host_version(),
            native_root: default_native_root(),
            auto_boot: default_true(),
        }
    }
}

fn default_base_path() -> String {
    "/ext".to_string()
}

fn default_host_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_native_root() -> String {
    "./ext".to_string()
}

fn default_true() -> bool {
    true
}
