//! Hook callback types and well-known hook names.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ExtensionError;

/// Priority used when a callback does not ask for one. Lower runs first.
pub const DEFAULT_PRIORITY: i32 = 10;

/// Hook names the host fires or applies.
pub mod names {
    /// Action fired once after boot with `{ core, external, total }`.
    pub const PLUGINS_LOADED: &str = "plugins_loaded";
    /// Filter over the admin sidebar menu item list.
    pub const ADMIN_MENU_ITEMS: &str = "admin_menu_items";
    /// Filter over the dashboard widget list.
    pub const DASHBOARD_WIDGETS: &str = "dashboard_widgets";
    /// Filter over the admin route list.
    pub const ADMIN_ROUTES: &str = "admin_routes";
}

/// Action callback: receives the fired arguments, returns nothing useful.
pub type ActionCallback = Arc<dyn Fn(&[Value]) -> Result<(), ExtensionError> + Send + Sync>;

/// Filter callback: receives the current value and extra arguments and
/// returns the replacement value.
pub type FilterCallback =
    Arc<dyn Fn(&Value, &[Value]) -> Result<Value, ExtensionError> + Send + Sync>;

/// A callback registered on a hook.
#[derive(Clone)]
pub struct HookEntry<C> {
    /// Namespace identifying the registrant. Unique per hook.
    pub namespace: String,
    /// The callback.
    pub callback: C,
    /// Priority (lower = earlier execution).
    pub priority: i32,
}

impl<C> fmt::Debug for HookEntry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookEntry")
            .field("namespace", &self.namespace)
            .field("priority", &self.priority)
            .finish()
    }
}
