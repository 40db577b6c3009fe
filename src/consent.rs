//! Opt-in registry for update checking.
//!
//! Ore guidelines require update checks to be opt-in, so the host
//! records each plugin's configured choice here before any check runs.
//! A check consults the registry once at entry and makes no network
//! call for plugins that never opted in.

use std::collections::HashSet;
use std::sync::RwLock;

/// Per-plugin opt-in state.
///
/// Injected into the checker rather than held as process globals so
/// hosts and tests can scope their own instances.
#[cfg_attr(test, mockall::automock)]
pub trait ConsentRegistry: Send + Sync {
    /// Records whether update checking is enabled for a plugin. The
    /// value must come from host configuration, never a hardcoded
    /// `true`.
    fn set_enabled(&self, plugin_id: &str, enabled: bool);

    /// Whether the plugin has opted in to update checking.
    fn is_enabled(&self, plugin_id: &str) -> bool;
}

/// In-memory registry, typically created once and shared for the
/// process lifetime. Every plugin starts out disabled.
#[derive(Debug, Default)]
pub struct MemoryConsentRegistry {
    enabled: RwLock<HashSet<String>>,
}

impl MemoryConsentRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConsentRegistry for MemoryConsentRegistry {
    fn set_enabled(&self, plugin_id: &str, enabled: bool) {
        let mut ids = self.enabled.write().expect("consent registry poisoned");
        if enabled {
            ids.insert(plugin_id.to_string());
        } else {
            ids.remove(plugin_id);
        }
    }

    fn is_enabled(&self, plugin_id: &str) -> bool {
        self.enabled
            .read()
            .expect("consent registry poisoned")
            .contains(plugin_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_by_default() {
        let registry = MemoryConsentRegistry::new();
        assert!(!registry.is_enabled("someplugin"));
    }

    #[test]
    fn test_set_enabled_round_trip() {
        let registry = MemoryConsentRegistry::new();
        registry.set_enabled("someplugin", true);
        assert!(registry.is_enabled("someplugin"));
        assert!(!registry.is_enabled("otherplugin"));

        registry.set_enabled("someplugin", false);
        assert!(!registry.is_enabled("someplugin"));
    }

    #[test]
    fn test_instances_are_isolated() {
        let a = MemoryConsentRegistry::new();
        let b = MemoryConsentRegistry::new();
        a.set_enabled("someplugin", true);
        assert!(!b.is_enabled("someplugin"));
    }
}
