//! Permission entity models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Extension-scoped permission metadata (`extension_permissions`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ExtensionPermission {
    /// Owning extension.
    pub extension_id: Uuid,
    /// Permission name, e.g. `plugin.backup.view`.
    pub permission_name: String,
    /// Description.
    pub description: Option<String>,
}

impl ExtensionPermission {
    /// Metadata row for a permission declared by an extension.
    pub fn declared_by(extension_id: Uuid, permission_name: impl Into<String>) -> Self {
        Self {
            extension_id,
            permission_name: permission_name.into(),
            description: Some(format!("Permission for extension {extension_id}")),
        }
    }
}

/// System-wide permission (`permissions`), unique by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CorePermission {
    /// Permission name.
    pub name: String,
    /// Resource the permission guards.
    pub resource: String,
    /// Action the permission grants.
    pub action: String,
    /// Description.
    pub description: Option<String>,
}

impl CorePermission {
    /// Core permission row registered on behalf of an extension.
    pub fn registered_by(extension_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resource: "extension".to_string(),
            action: "dynamic".to_string(),
            description: Some(format!("Registered by extension {extension_id}")),
        }
    }
}
