//! Host-side plugin identity.
//!
//! The host owns plugin lifecycle and metadata; a check only needs the
//! identity of the plugin being checked and a way to look up versions
//! of whatever else is currently installed.

use std::collections::HashMap;

/// Identity of the plugin a check runs for, supplied by the host.
#[derive(Debug, Clone)]
pub struct PluginMeta {
    /// Plugin id on the index, e.g. `nucleus`.
    pub id: String,
    /// Display name used in the request identity header.
    pub name: String,
    /// Declared version string; parsed at the start of a check.
    pub version: String,
    /// Dependencies declared by the installed plugin.
    pub dependencies: Vec<DeclaredDependency>,
}

/// A dependency as declared in the plugin's own metadata.
#[derive(Debug, Clone)]
pub struct DeclaredDependency {
    pub id: String,
    /// Required version string, possibly a range such as `[1.2,2.0)`.
    pub version: String,
}

/// Lookup into the host's set of installed plugins.
#[cfg_attr(test, mockall::automock)]
pub trait PluginDirectory: Send + Sync {
    /// Version string of the installed plugin, or `None` when the
    /// plugin is not installed.
    fn installed_version(&self, plugin_id: &str) -> Option<String>;
}

/// Simple hosts and tests can use a plain id → version map.
impl PluginDirectory for HashMap<String, String> {
    fn installed_version(&self, plugin_id: &str) -> Option<String> {
        self.get(plugin_id).cloned()
    }
}
