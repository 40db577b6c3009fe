//! Wire format of the index API responses (v2, session-based).

use serde::Deserialize;

/// `POST /authenticate` response.
#[derive(Debug, Deserialize)]
pub struct Authentication {
    #[serde(default)]
    pub session: Option<String>,
}

/// `GET /projects/{id}` response.
///
/// Missing and `null` promoted version lists are folded into `None`;
/// the checker treats both the same as an empty list.
#[derive(Debug, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub promoted_versions: Option<Vec<PromotedVersion>>,
}

/// One entry of a project's promoted version list, most recent first.
#[derive(Debug, Deserialize)]
pub struct PromotedVersion {
    pub version: String,
}

/// `GET /projects/{id}/versions/{version}` response.
#[derive(Debug, Deserialize)]
pub struct Release {
    /// Release notes, newline separated.
    pub description: String,
    pub dependencies: Vec<ManifestEntry>,
}

/// One dependency pin in a release manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub plugin_id: String,
    /// Version string, possibly a range such as `[1.2,2.0)`.
    pub version: String,
}
