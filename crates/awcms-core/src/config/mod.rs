//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod database;
pub mod extensions;
pub mod logging;

use serde::{Deserialize, Serialize};

pub use self::database::DatabaseConfig;
pub use self::extensions::ExtensionsConfig;
pub use self::logging::LoggingConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (base file + environment overlay) and
/// `AWCMS__*` environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Extension host settings.
    #[serde(default)]
    pub extensions: ExtensionsConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// Merges the given file with an environment-specific overlay
    /// (`config/<AWCMS_ENV>.toml`) and environment variables prefixed with
    /// `AWCMS`, e.g. `AWCMS__EXTENSIONS__BASE_PATH=/cdn/ext`.
    pub fn load(config_path: &str) -> Result<Self, AppError> {
        let env = std::env::var("AWCMS_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("AWCMS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Parse configuration from an in-memory TOML string.
    pub fn from_toml(source: &str) -> Result<Self, AppError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
            .map_err(AppError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.extensions.base_path, "/ext");
        assert_eq!(config.extensions.host_version, env!("CARGO_PKG_VERSION"));
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_overrides_extension_section() {
        let config = AppConfig::from_toml(
            r#"
            [extensions]
            base_path = "/cdn/extensions"
            host_version = "3.1.0"
            auto_boot = false
            "#,
        )
        .unwrap();
        assert_eq!(config.extensions.base_path, "/cdn/extensions");
        assert_eq!(config.extensions.host_version, "3.1.0");
        assert!(!config.extensions.auto_boot);
        assert_eq!(config.extensions.native_root, "./ext");
    }
}
