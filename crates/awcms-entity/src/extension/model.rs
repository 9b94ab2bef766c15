//! Extension entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Where an extension's code comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "extension_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExtensionType {
    /// Bundled with the host build.
    Core,
    /// Loaded at runtime from the external extension base path.
    External,
}

impl ExtensionType {
    /// Return the type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::External => "external",
        }
    }
}

impl std::fmt::Display for ExtensionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ExtensionType {
    type Err = awcms_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "core" => Ok(Self::Core),
            "external" => Ok(Self::External),
            _ => Err(awcms_core::AppError::validation(format!(
                "Invalid extension type: '{s}'"
            ))),
        }
    }
}

/// A row of the `extensions` table.
///
/// The host copies these rows once at boot; changes made afterwards are
/// not observed until the next boot.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Extension {
    /// Unique extension identifier.
    pub id: Uuid,
    /// Human-readable name.
    pub name: String,
    /// Stable slug, also the bundled plugin registry key.
    pub slug: String,
    /// Optional description.
    pub description: Option<String>,
    /// Declared version string.
    pub version: Option<String>,
    /// Core (bundled) or external.
    pub extension_type: ExtensionType,
    /// Whether the extension is enabled.
    pub is_active: bool,
    /// Component key resolved through the plugin registry (`plugin:Component`).
    pub component_key: Option<String>,
    /// Per-installation configuration handed to `register`.
    pub config: Option<Value>,
    /// Stored manifest for external extensions.
    pub manifest: Option<Value>,
    /// Absolute override of the computed external load path.
    pub external_path: Option<String>,
    /// Soft-deletion timestamp.
    pub deleted_at: Option<DateTime<Utc>>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Extension {
    /// Build an active core extension row, mainly for seeding and tests.
    pub fn new_core(name: impl Into<String>, slug: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            slug: slug.into(),
            description: None,
            version: None,
            extension_type: ExtensionType::Core,
            is_active: true,
            component_key: None,
            config: None,
            manifest: None,
            external_path: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Build an active external extension row.
    pub fn new_external(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            extension_type: ExtensionType::External,
            ..Self::new_core(name, slug)
        }
    }

    /// Set the component key.
    pub fn with_component_key(mut self, key: impl Into<String>) -> Self {
        self.component_key = Some(key.into());
        self
    }

    /// Set the configuration object.
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the stored manifest.
    pub fn with_manifest(mut self, manifest: Value) -> Self {
        self.manifest = Some(manifest);
        self
    }

    /// Whether the row should be loaded through the external loader.
    pub fn is_external(&self) -> bool {
        self.extension_type == ExtensionType::External
    }

    /// Whether the row is enabled and not soft-deleted.
    pub fn is_live(&self) -> bool {
        self.is_active && self.deleted_at.is_none()
    }

    /// Slug of the bundled plugin this row points at.
    ///
    /// Prefers the namespace part of a `plugin:Component` component key and
    /// falls back to the row slug.
    pub fn plugin_slug(&self) -> &str {
        self.component_key
            .as_deref()
            .and_then(|key| key.split_once(':').map(|(slug, _)| slug))
            .filter(|slug| !slug.is_empty())
            .unwrap_or(&self.slug)
    }

    /// Configuration handed to `register`, `{}` when unset.
    pub fn plugin_config(&self) -> Value {
        self.config
            .clone()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_slug_prefers_component_namespace() {
        let row = Extension::new_core("Backup", "backup-tools").with_component_key("backup:BackupManager");
        assert_eq!(row.plugin_slug(), "backup");

        let row = Extension::new_core("Backup", "backup").with_component_key("BackupManager");
        assert_eq!(row.plugin_slug(), "backup");

        let row = Extension::new_core("Hello", "helloworld");
        assert_eq!(row.plugin_slug(), "helloworld");
    }

    #[test]
    fn test_plugin_config_defaults_to_empty_object() {
        let row = Extension::new_core("Hello", "helloworld");
        assert_eq!(row.plugin_config(), serde_json::json!({}));
    }

    #[test]
    fn test_extension_type_parse() {
        assert_eq!("External".parse::<ExtensionType>().unwrap(), ExtensionType::External);
        assert!("bundled".parse::<ExtensionType>().is_err());
    }
}
