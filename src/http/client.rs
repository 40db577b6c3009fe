//! reqwest-backed client for the index API.

use async_trait::async_trait;
use log::debug;
use reqwest::header::{ACCEPT_ENCODING, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;

use crate::plugin::PluginMeta;

use super::{JsonObject, RemoteApi, TransportError};

/// Client for the index API, identifying itself on behalf of one
/// plugin. Redirects are followed (reqwest default); bodies are
/// requested uncompressed so the index serves them verbatim.
pub struct RemoteClient {
    client: Client,
}

impl RemoteClient {
    /// Builds a client whose `User-Agent` names this checker and the
    /// plugin the check runs for.
    pub fn for_plugin(plugin: &PluginMeta) -> Result<Self, TransportError> {
        let user_agent = format!(
            "orecheck/{} plugin {} ({} {})",
            env!("CARGO_PKG_VERSION"),
            plugin.name,
            plugin.id,
            plugin.version,
        );

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl RemoteApi for RemoteClient {
    #[tracing::instrument(skip(self, session))]
    async fn request(
        &self,
        method: Method,
        url: &str,
        session: Option<String>,
    ) -> Result<JsonObject, TransportError> {
        debug!("{} {}", method, url);

        let mut request = self.client.request(method, url);
        if let Some(session) = session {
            request = request.header(AUTHORIZATION, format!("OreApi session={session}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(TransportError::UnexpectedStatus {
                code: status.as_u16(),
                message: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        match response.json::<Value>().await {
            Ok(Value::Object(object)) => Ok(object),
            Ok(_) => Err(TransportError::MalformedResponse(
                "body is not a JSON object".to_string(),
            )),
            Err(error) => Err(TransportError::MalformedResponse(error.to_string())),
        }
    }
}
