//! Hook bus: fires actions and applies filters.
//!
//! Actions run every callback in priority order and discard their results.
//! Filters thread a value through each callback; the output of one is the
//! input of the next.
//!
//! A callback that returns an error or panics is logged and skipped. For
//! filters the value from before that callback carries on to the next one.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error};

use crate::error::ExtensionError;

use super::definitions::{ActionCallback, DEFAULT_PRIORITY, FilterCallback};
use super::registry::HookRegistry;

/// Named action and filter hooks shared by the host and its plugins.
#[derive(Debug, Default)]
pub struct HookBus {
    actions: HookRegistry<ActionCallback>,
    filters: HookRegistry<FilterCallback>,
}

impl HookBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action callback at the default priority.
    pub fn add_action<F>(&self, hook: &str, namespace: &str, callback: F)
    where
        F: Fn(&[Value]) -> Result<(), ExtensionError> + Send + Sync + 'static,
    {
        self.add_action_with_priority(hook, namespace, DEFAULT_PRIORITY, callback);
    }

    /// Registers an action callback.
    pub fn add_action_with_priority<F>(&self, hook: &str, namespace: &str, priority: i32, callback: F)
    where
        F: Fn(&[Value]) -> Result<(), ExtensionError> + Send + Sync + 'static,
    {
        self.actions
            .insert(hook, namespace, Arc::new(callback) as ActionCallback, priority);
    }

    /// Registers a filter callback at the default priority.
    pub fn add_filter<F>(&self, hook: &str, namespace: &str, callback: F)
    where
        F: Fn(&Value, &[Value]) -> Result<Value, ExtensionError> + Send + Sync + 'static,
    {
        self.add_filter_with_priority(hook, namespace, DEFAULT_PRIORITY, callback);
    }

    /// Registers a filter callback.
    pub fn add_filter_with_priority<F>(&self, hook: &str, namespace: &str, priority: i32, callback: F)
    where
        F: Fn(&Value, &[Value]) -> Result<Value, ExtensionError> + Send + Sync + 'static,
    {
        self.filters
            .insert(hook, namespace, Arc::new(callback) as FilterCallback, priority);
    }

    /// Removes an action callback. Returns whether one was registered.
    pub fn remove_action(&self, hook: &str, namespace: &str) -> bool {
        self.actions.remove(hook, namespace)
    }

    /// Removes a filter callback. Returns whether one was registered.
    pub fn remove_filter(&self, hook: &str, namespace: &str) -> bool {
        self.filters.remove(hook, namespace)
    }

    /// Fires an action.
    ///
    /// Every callback runs; failures are logged and returned so callers may
    /// surface them. An action without callbacks is a no-op.
    pub fn do_action(&self, hook: &str, args: &[Value]) -> Vec<ExtensionError> {
        let entries = self.actions.snapshot(hook);
        if entries.is_empty() {
            return Vec::new();
        }

        debug!(hook, callbacks = entries.len(), "Firing action");

        let mut failures = Vec::new();
        for entry in entries {
            let callback = entry.callback;
            if let Err(e) = invoke(hook, &entry.namespace, || callback(args)) {
                error!(hook, namespace = %entry.namespace, error = %e, "Error in action callback");
                failures.push(e);
            }
        }
        failures
    }

    /// Applies a filter and returns the final value.
    ///
    /// Returns `value` unchanged when no callback is registered.
    pub fn apply_filters(&self, hook: &str, value: Value, args: &[Value]) -> Value {
        self.apply_filters_with_report(hook, value, args).0
    }

    /// Applies a filter, also returning the callbacks that failed.
    pub fn apply_filters_with_report(
        &self,
        hook: &str,
        value: Value,
        args: &[Value],
    ) -> (Value, Vec<ExtensionError>) {
        let entries = self.filters.snapshot(hook);
        if entries.is_empty() {
            return (value, Vec::new());
        }

        debug!(hook, callbacks = entries.len(), "Applying filter");

        let mut current = value;
        let mut failures = Vec::new();
        for entry in entries {
            let callback = entry.callback;
            match invoke(hook, &entry.namespace, || callback(&current, args)) {
                Ok(next) => current = next,
                Err(e) => {
                    error!(hook, namespace = %entry.namespace, error = %e, "Error in filter callback");
                    failures.push(e);
                }
            }
        }
        (current, failures)
    }

    /// Whether any action callback is registered on `hook`.
    pub fn has_action(&self, hook: &str) -> bool {
        self.actions.contains(hook)
    }

    /// Whether any filter callback is registered on `hook`.
    pub fn has_filter(&self, hook: &str) -> bool {
        self.filters.contains(hook)
    }

    /// Namespaces of the action callbacks on `hook`, in execution order.
    pub fn action_namespaces(&self, hook: &str) -> Vec<String> {
        self.actions.namespaces(hook)
    }

    /// Namespaces of the filter callbacks on `hook`, in execution order.
    pub fn filter_namespaces(&self, hook: &str) -> Vec<String> {
        self.filters.namespaces(hook)
    }

    /// Hook names with at least one action callback.
    pub fn action_hooks(&self) -> Vec<String> {
        self.actions.hook_names()
    }

    /// Hook names with at least one filter callback.
    pub fn filter_hooks(&self) -> Vec<String> {
        self.filters.hook_names()
    }
}

/// Runs one callback, turning errors and panics into [`ExtensionError::Callback`].
fn invoke<T>(
    hook: &str,
    namespace: &str,
    f: impl FnOnce() -> Result<T, ExtensionError>,
) -> Result<T, ExtensionError> {
    let message = match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(e)) => e.to_string(),
        Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
    };
    Err(ExtensionError::Callback {
        hook: hook.to_string(),
        namespace: namespace.to_string(),
        message,
    })
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    fn push(tag: &'static str) -> impl Fn(&Value, &[Value]) -> Result<Value, ExtensionError> {
        move |value, _| {
            let mut items = value.as_array().cloned().unwrap_or_default();
            items.push(json!(tag));
            Ok(Value::Array(items))
        }
    }

    #[test]
    fn test_filter_without_callbacks_returns_input() {
        let bus = HookBus::new();
        assert_eq!(bus.apply_filters("nothing", json!(7), &[]), json!(7));
    }

    #[test]
    fn test_filter_priority_order() {
        let bus = HookBus::new();
        bus.add_filter_with_priority("x", "b", 20, push("b"));
        bus.add_filter_with_priority("x", "a", 5, push("a"));
        bus.add_filter("x", "c", push("c"));

        assert_eq!(bus.apply_filters("x", json!([]), &[]), json!(["a", "c", "b"]));
    }

    #[test]
    fn test_filter_receives_extra_args() {
        let bus = HookBus::new();
        bus.add_filter("greet", "ns", |value, args| {
            let who = args.first().and_then(Value::as_str).unwrap_or("nobody");
            Ok(json!(format!("{}, {who}", value.as_str().unwrap_or_default())))
        });
        assert_eq!(bus.apply_filters("greet", json!("hello"), &[json!("ada")]), json!("hello, ada"));
    }

    #[test]
    fn test_failing_filter_keeps_previous_value() {
        let bus = HookBus::new();
        bus.add_filter_with_priority("x", "first", 1, push("a"));
        bus.add_filter_with_priority("x", "broken", 2, |_, _| Err(ExtensionError::msg("nope")));
        bus.add_filter_with_priority("x", "panics", 3, |_, _| panic!("filter exploded"));
        bus.add_filter_with_priority("x", "last", 4, push("b"));

        let (value, failures) = bus.apply_filters_with_report("x", json!([]), &[]);
        assert_eq!(value, json!(["a", "b"]));
        assert_eq!(failures.len(), 2);
        assert!(failures[1].to_string().contains("filter exploded"));
    }

    #[test]
    fn test_action_runs_all_callbacks_despite_failures() {
        let bus = HookBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let log = seen.clone();
        bus.add_action("boot", "one", move |args| {
            log.lock().unwrap().push(format!("one:{}", args.len()));
            Ok(())
        });
        bus.add_action_with_priority("boot", "boom", 11, |_| panic!("bad plugin"));
        let log = seen.clone();
        bus.add_action_with_priority("boot", "two", 12, move |_| {
            log.lock().unwrap().push("two".to_string());
            Ok(())
        });

        let failures = bus.do_action("boot", &[json!(1), json!(2)]);
        assert_eq!(failures.len(), 1);
        assert_eq!(*seen.lock().unwrap(), vec!["one:2", "two"]);
    }

    #[test]
    fn test_reregister_replaces_callback() {
        let bus = HookBus::new();
        bus.add_filter("x", "ns", push("old"));
        bus.add_filter("x", "ns", push("new"));
        assert_eq!(bus.apply_filters("x", json!([]), &[]), json!(["new"]));
        assert_eq!(bus.filter_namespaces("x"), vec!["ns"]);
    }

    #[test]
    fn test_remove_filter_and_action() {
        let bus = HookBus::new();
        bus.add_filter("x", "ns", push("a"));
        bus.add_action("y", "ns", |_| Ok(()));

        assert!(bus.remove_filter("x", "ns"));
        assert!(!bus.remove_filter("x", "ns"));
        assert!(bus.remove_action("y", "ns"));
        assert!(!bus.has_filter("x"));
        assert!(!bus.has_action("y"));
        assert_eq!(bus.apply_filters("x", json!([]), &[]), json!([]));
    }

    #[test]
    fn test_callback_may_register_during_dispatch() {
        let bus = Arc::new(HookBus::new());
        let inner = bus.clone();
        bus.add_action("setup", "ns", move |_| {
            inner.add_filter("later", "ns", |v, _| Ok(v.clone()));
            Ok(())
        });
        assert!(bus.do_action("setup", &[]).is_empty());
        assert!(bus.has_filter("later"));
    }
}
