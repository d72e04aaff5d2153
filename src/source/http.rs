//! Blocking HTTP backend for the query endpoint.
//!
//! Posts wire-form query objects to the platform's REST API using a shared
//! `ureq` agent. Non-2xx responses surface as [`Error::RemoteQuery`] with
//! any server-provided detail message attached; this layer never retries.

use super::{BatchRequest, BatchResponse, DataSource, QueryRequest, QueryResponse};
use crate::config::Config;
use crate::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

/// HTTP implementation of [`DataSource`].
#[derive(Debug)]
pub struct HttpDataSource {
    agent: ureq::Agent,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpDataSource {
    /// Create a data source from an explicit configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let mut base_url = Url::parse(config.api_host()).map_err(|e| {
            Error::InvalidParameter(format!(
                "invalid API host \"{}\": {e}",
                config.api_host()
            ))
        })?;

        // Url::join treats the last path segment as a file unless the path
        // ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .http_status_as_error(false)
            .build()
            .new_agent();

        Ok(Self {
            agent,
            base_url,
            api_token: config.api_token().map(str::to_string),
        })
    }

    /// Create a data source configured from the environment.
    pub fn from_env() -> Result<Self> {
        Self::new(&Config::from_env()?)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::InvalidParameter(format!("invalid endpoint \"{path}\": {e}")))
    }

    fn post<T: DeserializeOwned>(&self, path: &str, body: &impl Serialize) -> Result<T> {
        let url = self.endpoint(path)?;
        tracing::debug!(url = %url, "POST");

        let mut request = self.agent.post(url.as_str());
        if let Some(token) = &self.api_token {
            request = request.header("Authorization", &format!("Token {token}"));
        }

        let mut response = request
            .send_json(body)
            .map_err(|e| Error::RemoteQuery(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .body_mut()
                .read_to_string()
                .ok()
                .and_then(|text| extract_detail(&text));
            return Err(Error::RemoteQuery(match detail {
                Some(detail) => format!("HTTP {} from {url}: {detail}", status.as_u16()),
                None => format!("HTTP {} from {url}", status.as_u16()),
            }));
        }

        response
            .body_mut()
            .read_json::<T>()
            .map_err(|e| Error::RemoteQuery(format!("invalid response from {url}: {e}")))
    }
}

impl DataSource for HttpDataSource {
    fn query(&self, dataset_id: &str, request: &QueryRequest) -> Result<QueryResponse> {
        self.post(&format!("v2/datasets/{dataset_id}/data"), request)
    }

    fn batch_query(&self, request: &BatchRequest) -> Result<BatchResponse> {
        self.post("v2/batch_query", request)
    }
}

/// Pull a human-readable message out of an error response body.
fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let map = value.as_object()?;

    if let Some(detail) = map.get("detail").and_then(Value::as_str) {
        return Some(detail.to_string());
    }
    if let Some(errors) = map.get("non_field_errors").and_then(Value::as_array) {
        let messages: Vec<&str> = errors.iter().filter_map(Value::as_str).collect();
        if !messages.is_empty() {
            return Some(messages.join(", "));
        }
    }
    None
}
