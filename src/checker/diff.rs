//! Dependency manifest comparison.

use std::collections::HashSet;

use log::{error, warn};

use crate::plugin::{DeclaredDependency, PluginDirectory};
use crate::version::Version;

use super::api::ManifestEntry;

/// How one dependency of the new release relates to the installed
/// plugins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyStatus {
    /// Required by the new release but not installed.
    New { id: String, required: Version },
    /// Installed, but older than the new release requires.
    NeedsUpgrade { id: String, required: Version },
    /// Installed at a sufficient version.
    Satisfied { id: String },
    /// Declared by the installed plugin but absent from the new
    /// release's manifest, so no longer required.
    Stale { id: String },
    /// The manifest entry's version string did not parse; the entry
    /// takes no part in any other classification.
    Ignored { id: String },
}

/// Classifies every manifest entry against the installed plugins, then
/// flags declared dependencies that disappeared from the manifest.
///
/// Output order is deterministic: manifest order first, then declared
/// order for the stale entries. A single bad entry never aborts the
/// diff.
pub fn classify(
    manifest: &[ManifestEntry],
    installed: &dyn PluginDirectory,
    declared: &[DeclaredDependency],
) -> Vec<DependencyStatus> {
    let mut statuses = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut ignored: HashSet<&str> = HashSet::new();

    for entry in manifest {
        let required = match Version::from_requirement(&entry.version) {
            Ok(required) => required,
            Err(err) => {
                warn!("ignoring dependency {}: {}", entry.plugin_id, err);
                ignored.insert(&entry.plugin_id);
                statuses.push(DependencyStatus::Ignored {
                    id: entry.plugin_id.clone(),
                });
                continue;
            }
        };
        seen.insert(&entry.plugin_id);

        let Some(installed_version) = installed.installed_version(&entry.plugin_id) else {
            statuses.push(DependencyStatus::New {
                id: entry.plugin_id.clone(),
                required,
            });
            continue;
        };

        match installed_version.parse::<Version>() {
            Err(err) => {
                // Neither new nor stale; the entry just cannot be compared.
                error!(
                    "installed dependency {} has unparseable version {:?}: {}",
                    entry.plugin_id, installed_version, err
                );
            }
            Ok(current) if current < required => {
                statuses.push(DependencyStatus::NeedsUpgrade {
                    id: entry.plugin_id.clone(),
                    required,
                });
            }
            Ok(_) => {
                statuses.push(DependencyStatus::Satisfied {
                    id: entry.plugin_id.clone(),
                });
            }
        }
    }

    for dependency in declared {
        if !seen.contains(dependency.id.as_str()) && !ignored.contains(dependency.id.as_str()) {
            statuses.push(DependencyStatus::Stale {
                id: dependency.id.clone(),
            });
        }
    }

    statuses
}
