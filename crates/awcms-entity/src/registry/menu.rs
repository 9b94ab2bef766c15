//! Menu item registry entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A row of `extension_menu_items`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MenuItemEntry {
    /// Row identifier.
    pub id: Uuid,
    /// Owning extension.
    pub extension_id: Uuid,
    /// Menu label.
    pub label: String,
    /// Target path.
    pub path: String,
    /// Icon identifier.
    pub icon: Option<String>,
    /// Sort order.
    #[sqlx(rename = "order")]
    #[serde(rename = "order")]
    pub sort_order: i32,
    /// Whether the item is currently active.
    pub is_active: bool,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a menu item row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMenuItem {
    /// Owning extension.
    pub extension_id: Uuid,
    /// Menu label.
    pub label: String,
    /// Target path.
    pub path: String,
    /// Icon identifier.
    pub icon: Option<String>,
    /// Sort order.
    pub sort_order: i32,
    /// Whether the item is active.
    pub is_active: bool,
}
