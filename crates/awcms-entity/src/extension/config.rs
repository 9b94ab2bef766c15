//! Declared extension configuration (routes, menus, permissions).
//!
//! This is the object an extension ships with and the lifecycle sync
//! projects into the registry tables.

use serde::{Deserialize, Serialize};

/// Routes, menus and permissions declared by an extension.
///
/// Each section is optional; an absent section leaves its registry table
/// untouched during a sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionConfig {
    /// Declared admin routes.
    #[serde(default)]
    pub routes: Option<Vec<RouteDeclaration>>,
    /// Declared admin menu items.
    #[serde(default)]
    pub menus: Option<Vec<MenuDeclaration>>,
    /// Declared permission names.
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

/// A route an extension contributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDeclaration {
    /// Route path.
    pub path: String,
    /// Component key rendered for the route.
    #[serde(default)]
    pub component: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Icon identifier.
    #[serde(default)]
    pub icon: Option<String>,
    /// Whether the route needs a signed-in user. Defaults to true.
    #[serde(default)]
    pub requires_auth: Option<bool>,
    /// Permissions required to open the route.
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

/// A menu item an extension contributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuDeclaration {
    /// Menu label.
    pub label: String,
    /// Target path.
    pub path: String,
    /// Icon identifier.
    #[serde(default)]
    pub icon: Option<String>,
    /// Sort order.
    #[serde(default)]
    pub order: Option<i32>,
}
