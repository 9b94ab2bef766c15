//! Registry of bundled plugins.
//!
//! The table is assembled once by the host from the plugins compiled into
//! the build. Component lookups never fail: unresolvable keys yield a
//! [`NotFoundComponent`].

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::component::{ComponentRef, NotFoundComponent};
use crate::module::{ExtensionModule, PluginManifest};

/// Legacy flat component keys and the namespaced keys they map to.
pub const LEGACY_KEY_MAP: &[(&str, &str)] = &[
    ("BackupManager", "backup:BackupManager"),
    ("BackupScheduler", "backup:BackupScheduler"),
    ("BackupSettings", "backup:BackupSettings"),
    ("HelloWorld", "helloworld"),
];

/// Which lifecycle functions a plugin exports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PluginLifecycle {
    /// Exports `register`.
    pub has_register: bool,
    /// Exports `activate`.
    pub has_activate: bool,
    /// Exports `deactivate`.
    pub has_deactivate: bool,
}

/// Bundled plugins keyed by slug, in registration order.
#[derive(Debug, Default, Clone)]
pub struct PluginRegistry {
    plugins: Vec<(String, Arc<ExtensionModule>)>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plugin, builder style.
    pub fn with_plugin(mut self, slug: impl Into<String>, module: ExtensionModule) -> Self {
        self.register(slug, module);
        self
    }

    /// Adds a plugin, replacing any plugin with the same slug.
    pub fn register(&mut self, slug: impl Into<String>, module: ExtensionModule) {
        let slug = slug.into();
        let module = Arc::new(module);

        info!(
            slug = %slug,
            components = ?module.component_names(),
            "Bundled plugin registered"
        );

        match self.plugins.iter_mut().find(|(s, _)| *s == slug) {
            Some(entry) => entry.1 = module,
            None => self.plugins.push((slug, module)),
        }
    }

    /// The module registered under `slug`.
    pub fn get_plugin(&self, slug: &str) -> Option<Arc<ExtensionModule>> {
        self.plugins
            .iter()
            .find(|(s, _)| s == slug)
            .map(|(_, m)| m.clone())
    }

    /// All plugins, in registration order.
    pub fn all_plugins(&self) -> &[(String, Arc<ExtensionModule>)] {
        &self.plugins
    }

    /// Slugs of all plugins, in registration order.
    pub fn slugs(&self) -> Vec<String> {
        self.plugins.iter().map(|(s, _)| s.clone()).collect()
    }

    /// Resolves a component key. Never fails.
    ///
    /// Lookup order:
    /// 1. `slug:Component` in the named plugin
    /// 2. `key` as a component name in any plugin, first match wins
    /// 3. the default component of the plugin named by `key` (or its
    ///    namespace part)
    /// 4. a [`NotFoundComponent`] naming the key
    pub fn get_plugin_component(&self, key: &str) -> ComponentRef {
        let namespace = key.split_once(':');

        if let Some((slug, name)) = namespace
            && let Some(component) = self.get_plugin(slug).and_then(|m| m.component(name))
        {
            return component;
        }

        if let Some(component) = self.plugins.iter().find_map(|(_, m)| m.component(key)) {
            return component;
        }

        let slug = namespace.map(|(slug, _)| slug).unwrap_or(key);
        if let Some(component) = self.get_plugin(slug).and_then(|m| m.default_component()) {
            return component;
        }

        debug!(key, "Plugin component not found");
        Arc::new(NotFoundComponent::new(key))
    }

    /// Resolves a component key, translating legacy flat keys first.
    pub fn get_extension_component(&self, key: &str) -> ComponentRef {
        self.get_plugin_component(resolve_legacy_key(key))
    }

    /// The bundled manifest of a plugin.
    pub fn get_plugin_manifest(&self, slug: &str) -> Option<PluginManifest> {
        self.get_plugin(slug).and_then(|m| m.manifest().cloned())
    }

    /// Which lifecycle functions a plugin exports. All false for unknown slugs.
    pub fn get_plugin_lifecycle(&self, slug: &str) -> PluginLifecycle {
        self.get_plugin(slug)
            .map(|m| PluginLifecycle {
                has_register: m.has_register(),
                has_activate: m.has_activate(),
                has_deactivate: m.has_deactivate(),
            })
            .unwrap_or_default()
    }

    /// Every resolvable `slug:Component` key, sorted.
    pub fn available_components(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .plugins
            .iter()
            .flat_map(|(slug, m)| {
                m.component_names()
                    .into_iter()
                    .map(move |name| format!("{slug}:{name}"))
            })
            .collect();
        keys.sort();
        keys
    }
}

/// Maps a legacy flat key to its namespaced form. Other keys pass through.
pub fn resolve_legacy_key(key: &str) -> &str {
    LEGACY_KEY_MAP
        .iter()
        .find(|(legacy, _)| *legacy == key)
        .map(|(_, namespaced)| *namespaced)
        .unwrap_or(key)
}
