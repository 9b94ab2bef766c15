//! Per-hook callback storage keyed by namespace and ordered by priority.

use std::fmt;

use dashmap::DashMap;
use tracing::debug;

use super::definitions::HookEntry;

/// Hook name → callbacks sorted by ascending priority.
///
/// At most one entry per `(hook, namespace)` pair. Entries with equal
/// priority keep their registration order.
pub struct HookRegistry<C> {
    entries: DashMap<String, Vec<HookEntry<C>>>,
}

impl<C: Clone> HookRegistry<C> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Registers a callback, replacing any existing one under the same namespace.
    ///
    /// A replacement is re-queued behind existing entries of equal priority.
    pub fn insert(&self, hook: &str, namespace: &str, callback: C, priority: i32) {
        let mut entries = self.entries.entry(hook.to_string()).or_default();
        entries.retain(|e| e.namespace != namespace);
        entries.push(HookEntry {
            namespace: namespace.to_string(),
            callback,
            priority,
        });
        entries.sort_by_key(|e| e.priority);

        debug!(hook, namespace, priority, "Hook callback registered");
    }

    /// Removes the callback registered under `namespace`. Returns whether one existed.
    pub fn remove(&self, hook: &str, namespace: &str) -> bool {
        let Some(mut entries) = self.entries.get_mut(hook) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|e| e.namespace != namespace);
        let removed = entries.len() != before;
        let empty = entries.is_empty();
        drop(entries);

        if empty {
            self.entries.remove_if(hook, |_, v| v.is_empty());
        }
        removed
    }

    /// Copies the callbacks of a hook in execution order.
    ///
    /// The map guard is released before returning so callbacks may register
    /// or remove hooks while they run.
    pub fn snapshot(&self, hook: &str) -> Vec<HookEntry<C>> {
        self.entries
            .get(hook)
            .map(|entries| entries.value().clone())
            .unwrap_or_default()
    }

    /// Namespaces registered on a hook, in execution order.
    pub fn namespaces(&self, hook: &str) -> Vec<String> {
        self.entries
            .get(hook)
            .map(|entries| entries.iter().map(|e| e.namespace.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of callbacks on a hook.
    pub fn count(&self, hook: &str) -> usize {
        self.entries.get(hook).map(|e| e.len()).unwrap_or(0)
    }

    /// Whether a hook has any callback.
    pub fn contains(&self, hook: &str) -> bool {
        self.count(hook) > 0
    }

    /// All hook names with at least one callback, sorted.
    pub fn hook_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .iter()
            .filter(|e| !e.value().is_empty())
            .map(|e| e.key().clone())
            .collect();
        names.sort();
        names
    }
}

impl<C> fmt::Debug for HookRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.entries.len())
            .finish()
    }
}

impl<C: Clone> Default for HookRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_by_priority_then_registration() {
        let registry: HookRegistry<u8> = HookRegistry::new();
        registry.insert("h", "late", 1, 20);
        registry.insert("h", "first", 2, 10);
        registry.insert("h", "second", 3, 10);
        registry.insert("h", "early", 4, 5);

        assert_eq!(registry.namespaces("h"), vec!["early", "first", "second", "late"]);
    }

    #[test]
    fn test_reregister_replaces_and_requeues() {
        let registry: HookRegistry<u8> = HookRegistry::new();
        registry.insert("h", "a", 1, 10);
        registry.insert("h", "b", 2, 10);
        registry.insert("h", "a", 3, 10);

        assert_eq!(registry.namespaces("h"), vec!["b", "a"]);
        let snapshot = registry.snapshot("h");
        assert_eq!(snapshot[1].callback, 3);
    }

    #[test]
    fn test_remove_drops_empty_hooks() {
        let registry: HookRegistry<u8> = HookRegistry::new();
        registry.insert("h", "a", 1, 10);
        assert!(!registry.remove("h", "missing"));
        assert!(registry.remove("h", "a"));
        assert!(!registry.remove("h", "a"));
        assert!(!registry.contains("h"));
        assert!(registry.hook_names().is_empty());
    }
}
