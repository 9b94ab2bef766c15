//! Registry table projections of an extension's routes, menus and permissions.

pub mod menu;
pub mod permission;
pub mod route;

pub use menu::{MenuItemEntry, NewMenuItem};
pub use permission::{CorePermission, ExtensionPermission};
pub use route::{NewRouteEntry, RouteRegistryEntry};
