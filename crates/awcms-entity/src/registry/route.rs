//! Route registry entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A row of `extension_routes_registry`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RouteRegistryEntry {
    /// Row identifier.
    pub id: Uuid,
    /// Owning extension.
    pub extension_id: Uuid,
    /// Route path.
    pub path: String,
    /// Component key rendered for the route.
    pub component_key: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Icon identifier.
    pub icon: Option<String>,
    /// Whether a signed-in user is required.
    pub requires_auth: bool,
    /// Permissions required to open the route.
    pub required_permissions: Vec<String>,
    /// Whether the route is currently active.
    pub is_active: bool,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a route registry row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRouteEntry {
    /// Owning extension.
    pub extension_id: Uuid,
    /// Route path.
    pub path: String,
    /// Component key rendered for the route.
    pub component_key: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Icon identifier.
    pub icon: Option<String>,
    /// Whether a signed-in user is required.
    pub requires_auth: bool,
    /// Permissions required to open the route.
    pub required_permissions: Vec<String>,
    /// Whether the route is active.
    pub is_active: bool,
}
