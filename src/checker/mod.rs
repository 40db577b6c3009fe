//! Update check orchestration.
//!
//! A check runs a fixed sequence against the index: authenticate,
//! fetch the project, and, only when the promoted release is newer
//! than the installed plugin, fetch that release to report its notes
//! and dependency changes. Calls are strictly sequential and each is
//! attempted once; the first failure aborts the whole check, so a
//! check either reports completely or not at all.

pub mod api;
mod diff;

pub use diff::{DependencyStatus, classify};

use log::{debug, info};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::consent::ConsentRegistry;
use crate::http::{RemoteApi, TransportError};
use crate::plugin::{PluginDirectory, PluginMeta};
use crate::version::{InvalidVersion, Version};

/// Public index instance queried when the host does not override the
/// API URL.
pub const DEFAULT_API_URL: &str = "https://ore.spongepowered.org/api/v2";

/// Reasons an update check can abort.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The authenticate endpoint returned no session.
    #[error("could not open an index session")]
    Session,

    /// The project has no promoted release to compare against.
    #[error("project has no promoted versions")]
    NoPromotedVersion,

    /// A response decoded as JSON but not as the expected payload.
    #[error("unexpected response payload: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    /// The local or remote plugin version could not be parsed.
    #[error(transparent)]
    Version(#[from] InvalidVersion),
}

/// Terminal result of one update check, for the host to render.
#[derive(Debug)]
pub enum CheckOutcome {
    /// The plugin never opted in; no network call was made.
    Disabled,
    /// The promoted release is not newer than the installed version.
    UpToDate,
    /// A newer release was found.
    UpdateAvailable(UpdateReport),
    /// The check aborted; nothing else is reported.
    Failed(CheckError),
}

/// Everything the host needs to announce an update.
#[derive(Debug)]
pub struct UpdateReport {
    /// Version of the promoted release.
    pub version: Version,
    /// Release notes, split into lines.
    pub description: Vec<String>,
    /// Dependency changes relative to the installed plugins.
    pub dependencies: Vec<DependencyStatus>,
}

/// Runs update checks against one index instance.
pub struct UpdateChecker<'a, R: RemoteApi> {
    remote: &'a R,
    consent: &'a dyn ConsentRegistry,
    plugins: &'a dyn PluginDirectory,
    api_url: String,
}

impl<'a, R: RemoteApi> UpdateChecker<'a, R> {
    pub fn new(
        remote: &'a R,
        consent: &'a dyn ConsentRegistry,
        plugins: &'a dyn PluginDirectory,
        api_url: impl Into<String>,
    ) -> Self {
        Self {
            remote,
            consent,
            plugins,
            api_url: api_url.into(),
        }
    }

    /// Runs the full check for `plugin`.
    ///
    /// Never returns an error: failures land in
    /// [`CheckOutcome::Failed`] for the host to log at its discretion.
    #[tracing::instrument(skip(self, plugin), fields(plugin = %plugin.id))]
    pub async fn check(&self, plugin: &PluginMeta) -> CheckOutcome {
        if !self.consent.is_enabled(&plugin.id) {
            debug!("update check for {} is disabled, skipping", plugin.id);
            return CheckOutcome::Disabled;
        }

        match self.run(plugin).await {
            Ok(outcome) => outcome,
            Err(error) => CheckOutcome::Failed(error),
        }
    }

    async fn run(&self, plugin: &PluginMeta) -> Result<CheckOutcome, CheckError> {
        let current: Version = plugin.version.parse()?;

        let auth: api::Authentication = self
            .fetch(Method::POST, format!("{}/authenticate", self.api_url), None)
            .await?;
        let session = auth.session.ok_or(CheckError::Session)?;

        let project: api::Project = self
            .fetch(
                Method::GET,
                format!("{}/projects/{}", self.api_url, plugin.id),
                Some(&session),
            )
            .await?;
        let promoted = project
            .promoted_versions
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or(CheckError::NoPromotedVersion)?;

        let remote: Version = promoted.version.parse()?;
        if remote <= current {
            debug!("{} {} is up to date", plugin.id, current);
            return Ok(CheckOutcome::UpToDate);
        }

        info!(
            "update found: {} {} is available (installed: {})",
            plugin.id, remote, current
        );

        // The release is addressed by the index's own version string,
        // not our canonical rendering of it.
        let release: api::Release = self
            .fetch(
                Method::GET,
                format!(
                    "{}/projects/{}/versions/{}",
                    self.api_url, plugin.id, promoted.version
                ),
                Some(&session),
            )
            .await?;

        let description = release.description.lines().map(String::from).collect();
        let dependencies = classify(&release.dependencies, self.plugins, &plugin.dependencies);

        Ok(CheckOutcome::UpdateAvailable(UpdateReport {
            version: remote,
            description,
            dependencies,
        }))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        url: String,
        session: Option<&str>,
    ) -> Result<T, CheckError> {
        let object = self
            .remote
            .request(method, &url, session.map(String::from))
            .await?;
        Ok(serde_json::from_value(Value::Object(object))?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::consent::MemoryConsentRegistry;
    use crate::http::{JsonObject, MockRemoteApi};
    use crate::plugin::DeclaredDependency;

    const API: &str = "https://index.test/api/v2";

    fn plugin() -> PluginMeta {
        PluginMeta {
            id: "someplugin".into(),
            name: "Some Plugin".into(),
            version: "1.0".into(),
            dependencies: vec![],
        }
    }

    fn consent_for(id: &str) -> MemoryConsentRegistry {
        let consent = MemoryConsentRegistry::new();
        consent.set_enabled(id, true);
        consent
    }

    fn obj(value: serde_json::Value) -> JsonObject {
        match value {
            Value::Object(object) => object,
            other => panic!("expected a JSON object, got {other}"),
        }
    }

    fn expect_auth(remote: &mut MockRemoteApi) {
        remote
            .expect_request()
            .withf(|method, url, session| {
                *method == Method::POST && url.ends_with("/authenticate") && session.is_none()
            })
            .times(1)
            .returning(|_, _, _| Ok(obj(json!({"session": "abc"}))));
    }

    fn expect_project(remote: &mut MockRemoteApi, body: serde_json::Value) {
        remote
            .expect_request()
            .withf(|method, url, session| {
                *method == Method::GET
                    && url.ends_with("/projects/someplugin")
                    && session.as_deref() == Some("abc")
            })
            .times(1)
            .returning(move |_, _, _| Ok(obj(body.clone())));
    }

    #[tokio::test]
    async fn test_disabled_plugin_makes_no_calls() {
        let mut remote = MockRemoteApi::new();
        remote.expect_request().times(0);
        let consent = MemoryConsentRegistry::new();
        let installed: HashMap<String, String> = HashMap::new();

        let checker = UpdateChecker::new(&remote, &consent, &installed, API);
        let outcome = checker.check(&plugin()).await;

        assert!(matches!(outcome, CheckOutcome::Disabled));
    }

    #[tokio::test]
    async fn test_unparseable_local_version_fails_before_any_call() {
        let mut remote = MockRemoteApi::new();
        remote.expect_request().times(0);
        let consent = consent_for("someplugin");
        let installed: HashMap<String, String> = HashMap::new();

        let mut plugin = plugin();
        plugin.version = "not a version".into();

        let checker = UpdateChecker::new(&remote, &consent, &installed, API);
        let outcome = checker.check(&plugin).await;

        assert!(matches!(
            outcome,
            CheckOutcome::Failed(CheckError::Version(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_session_fails_after_one_call() {
        let mut remote = MockRemoteApi::new();
        remote
            .expect_request()
            .withf(|_, url, _| url.ends_with("/authenticate"))
            .times(1)
            .returning(|_, _, _| Ok(obj(json!({"error": "nope"}))));
        let consent = consent_for("someplugin");
        let installed: HashMap<String, String> = HashMap::new();

        let checker = UpdateChecker::new(&remote, &consent, &installed, API);
        let outcome = checker.check(&plugin()).await;

        assert!(matches!(
            outcome,
            CheckOutcome::Failed(CheckError::Session)
        ));
    }

    #[tokio::test]
    async fn test_missing_promoted_versions_stops_the_check() {
        let mut remote = MockRemoteApi::new();
        expect_auth(&mut remote);
        expect_project(&mut remote, json!({"name": "someplugin"}));
        let consent = consent_for("someplugin");
        let installed: HashMap<String, String> = HashMap::new();

        let checker = UpdateChecker::new(&remote, &consent, &installed, API);
        let outcome = checker.check(&plugin()).await;

        assert!(matches!(
            outcome,
            CheckOutcome::Failed(CheckError::NoPromotedVersion)
        ));
    }

    #[tokio::test]
    async fn test_null_and_empty_promoted_versions_fail_alike() {
        for body in [
            json!({"promoted_versions": null}),
            json!({"promoted_versions": []}),
        ] {
            let mut remote = MockRemoteApi::new();
            expect_auth(&mut remote);
            expect_project(&mut remote, body);
            let consent = consent_for("someplugin");
            let installed: HashMap<String, String> = HashMap::new();

            let checker = UpdateChecker::new(&remote, &consent, &installed, API);
            let outcome = checker.check(&plugin()).await;

            assert!(matches!(
                outcome,
                CheckOutcome::Failed(CheckError::NoPromotedVersion)
            ));
        }
    }

    #[tokio::test]
    async fn test_up_to_date_skips_the_release_fetch() {
        let mut remote = MockRemoteApi::new();
        expect_auth(&mut remote);
        expect_project(
            &mut remote,
            json!({"promoted_versions": [{"version": "1.0"}, {"version": "2.0"}]}),
        );
        let consent = consent_for("someplugin");
        let installed: HashMap<String, String> = HashMap::new();

        let checker = UpdateChecker::new(&remote, &consent, &installed, API);
        let outcome = checker.check(&plugin()).await;

        // Only the first promoted version counts, and it is not newer.
        assert!(matches!(outcome, CheckOutcome::UpToDate));
    }

    #[tokio::test]
    async fn test_older_promoted_version_is_up_to_date() {
        let mut remote = MockRemoteApi::new();
        expect_auth(&mut remote);
        expect_project(
            &mut remote,
            json!({"promoted_versions": [{"version": "0.9"}]}),
        );
        let consent = consent_for("someplugin");
        let installed: HashMap<String, String> = HashMap::new();

        let checker = UpdateChecker::new(&remote, &consent, &installed, API);
        let outcome = checker.check(&plugin()).await;

        assert!(matches!(outcome, CheckOutcome::UpToDate));
    }

    #[tokio::test]
    async fn test_update_available_reports_notes_and_dependencies() {
        let mut remote = MockRemoteApi::new();
        expect_auth(&mut remote);
        expect_project(
            &mut remote,
            json!({"promoted_versions": [{"version": "2.0"}]}),
        );
        remote
            .expect_request()
            .withf(|method, url, session| {
                *method == Method::GET
                    && url.ends_with("/projects/someplugin/versions/2.0")
                    && session.as_deref() == Some("abc")
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(obj(json!({
                    "description": "Big release\r\nwith fixes",
                    "dependencies": [
                        {"plugin_id": "dep", "version": "[1.2,2.0)"},
                        {"plugin_id": "fresh", "version": "1.0"}
                    ]
                })))
            });
        let consent = consent_for("someplugin");
        let installed = HashMap::from([("dep".to_string(), "1.0".to_string())]);

        let mut plugin = plugin();
        plugin.dependencies = vec![DeclaredDependency {
            id: "gone".into(),
            version: "1.0".into(),
        }];

        let checker = UpdateChecker::new(&remote, &consent, &installed, API);
        let outcome = checker.check(&plugin).await;

        let CheckOutcome::UpdateAvailable(report) = outcome else {
            panic!("expected an update, got {outcome:?}");
        };
        assert_eq!(report.version, "2.0".parse().unwrap());
        assert_eq!(report.description, vec!["Big release", "with fixes"]);
        assert_eq!(
            report.dependencies,
            vec![
                DependencyStatus::NeedsUpgrade {
                    id: "dep".into(),
                    required: "1.2".parse().unwrap(),
                },
                DependencyStatus::New {
                    id: "fresh".into(),
                    required: "1.0".parse().unwrap(),
                },
                DependencyStatus::Stale { id: "gone".into() },
            ]
        );
    }

    #[tokio::test]
    async fn test_transport_error_aborts_the_check() {
        let mut remote = MockRemoteApi::new();
        remote
            .expect_request()
            .times(1)
            .returning(|_, _, _| {
                Err(TransportError::UnexpectedStatus {
                    code: 503,
                    message: "Service Unavailable".into(),
                })
            });
        let consent = consent_for("someplugin");
        let installed: HashMap<String, String> = HashMap::new();

        let checker = UpdateChecker::new(&remote, &consent, &installed, API);
        let outcome = checker.check(&plugin()).await;

        assert!(matches!(
            outcome,
            CheckOutcome::Failed(CheckError::Transport(TransportError::UnexpectedStatus {
                code: 503,
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn test_unparseable_remote_version_fails_the_check() {
        let mut remote = MockRemoteApi::new();
        expect_auth(&mut remote);
        expect_project(
            &mut remote,
            json!({"promoted_versions": [{"version": "latest"}]}),
        );
        let consent = consent_for("someplugin");
        let installed: HashMap<String, String> = HashMap::new();

        let checker = UpdateChecker::new(&remote, &consent, &installed, API);
        let outcome = checker.check(&plugin()).await;

        assert!(matches!(
            outcome,
            CheckOutcome::Failed(CheckError::Version(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_release_payload_fails_the_check() {
        let mut remote = MockRemoteApi::new();
        expect_auth(&mut remote);
        expect_project(
            &mut remote,
            json!({"promoted_versions": [{"version": "2.0"}]}),
        );
        remote
            .expect_request()
            .withf(|_, url, _| url.ends_with("/versions/2.0"))
            .times(1)
            .returning(|_, _, _| Ok(obj(json!({"description": "notes"}))));
        let consent = consent_for("someplugin");
        let installed: HashMap<String, String> = HashMap::new();

        let checker = UpdateChecker::new(&remote, &consent, &installed, API);
        let outcome = checker.check(&plugin()).await;

        // a release without a dependencies array is not a valid payload
        assert!(matches!(
            outcome,
            CheckOutcome::Failed(CheckError::InvalidResponse(_))
        ));
    }
}
