//! HTTP access to the plugin index API.
//!
//! Every call is a single attempt: a failed request aborts the update
//! check that issued it, so there is no retry layer here.

mod client;

pub use client::RemoteClient;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Map, Value};
use thiserror::Error;

/// A response body parsed as a single JSON object.
pub type JsonObject = Map<String, Value>;

/// Failure of a single index API call.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The index answered with something other than 200.
    #[error("unexpected status {code} {message}")]
    UnexpectedStatus { code: u16, message: String },

    /// The body was not a single JSON object.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Connection-level failure.
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),
}

/// One authenticated call against the index API.
///
/// Implementations issue exactly one request per call and surface
/// failures to the caller instead of retrying.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn request(
        &self,
        method: Method,
        url: &str,
        session: Option<String>,
    ) -> Result<JsonObject, TransportError>;
}
