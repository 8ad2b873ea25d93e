//! HTTP client for the remote polishing service.
//!
//! The coordinator talks to the service exclusively through the
//! [`PolishBackend`] seam; [`HttpPolishClient`] is the production
//! implementation. Connection settings are read from the shared store
//! before every call by the caller and passed in, so a settings change
//! takes effect on the next request without rebuilding the client.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use burnish_config::HttpTunables;
use burnish_protocol::error::{JobError, JobResult};
use burnish_protocol::records::{ConnectionSettings, PolishOutcome};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterStatus {
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub adapters: BTreeMap<String, AdapterStatus>,
}

#[derive(Debug, Serialize)]
struct PolishRequestBody<'a> {
    text: &'a str,
    model_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<String>,
}

/// Seam between the coordinator and the remote service. The call blocks
/// for up to the configured ceiling and must honor the cancellation token.
#[async_trait]
pub trait PolishBackend: Send + Sync {
    async fn polish(
        &self,
        settings: &ConnectionSettings,
        text: &str,
        model_id: &str,
        cancel: &CancellationToken,
    ) -> JobResult<PolishOutcome>;
}

pub struct HttpPolishClient {
    http: Client,
    request_timeout: Duration,
    health_timeout: Duration,
}

impl HttpPolishClient {
    pub fn new(tunables: HttpTunables) -> JobResult<Self> {
        let http = Client::builder()
            .build()
            .map_err(|error| JobError::Transport(format!("failed to build HTTP client: {error}")))?;
        Ok(Self {
            http,
            request_timeout: tunables.request_timeout,
            health_timeout: tunables.health_timeout,
        })
    }

    fn endpoint(settings: &ConnectionSettings, path: &str) -> String {
        let base = settings.endpoint_url.trim_end_matches('/');
        let suffix = path.trim_start_matches('/');
        format!("{base}/{suffix}")
    }

    fn headers(settings: &ConnectionSettings) -> JobResult<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        let key = settings.api_key.trim();
        if !key.is_empty() {
            let value = header::HeaderValue::from_str(key).map_err(|error| {
                JobError::Transport(format!("configured api key is not a valid header: {error}"))
            })?;
            headers.insert(API_KEY_HEADER, value);
        }
        Ok(headers)
    }

    pub async fn health(&self, settings: &ConnectionSettings) -> JobResult<HealthReport> {
        let url = Self::endpoint(settings, "api/health");
        let request = self.http.get(url).headers(Self::headers(settings)?);
        match tokio::time::timeout(self.health_timeout, Self::request_json(request)).await {
            Ok(result) => result,
            Err(_) => Err(JobError::Transport(format!(
                "health check timed out after {}s",
                self.health_timeout.as_secs()
            ))),
        }
    }

    pub async fn models(&self, settings: &ConnectionSettings) -> JobResult<Vec<ModelInfo>> {
        let url = Self::endpoint(settings, "api/models");
        let request = self.http.get(url).headers(Self::headers(settings)?);
        match tokio::time::timeout(self.health_timeout, Self::request_json(request)).await {
            Ok(result) => result,
            Err(_) => Err(JobError::Transport(format!(
                "model listing timed out after {}s",
                self.health_timeout.as_secs()
            ))),
        }
    }

    async fn request_json<T: serde::de::DeserializeOwned>(
        request: reqwest::RequestBuilder,
    ) -> JobResult<T> {
        let response = request
            .send()
            .await
            .map_err(|error| JobError::Transport(format!("request failed: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| JobError::Transport(format!("response read failed: {error}")))?;

        if !status.is_success() {
            return Err(JobError::Transport(error_detail(status, &body)));
        }

        serde_json::from_str(&body)
            .map_err(|error| JobError::Transport(format!("response was malformed JSON: {error}")))
    }
}

fn error_detail(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .filter(|detail| !detail.trim().is_empty())
        .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()))
}

#[async_trait]
impl PolishBackend for HttpPolishClient {
    async fn polish(
        &self,
        settings: &ConnectionSettings,
        text: &str,
        model_id: &str,
        cancel: &CancellationToken,
    ) -> JobResult<PolishOutcome> {
        let url = Self::endpoint(settings, "api/polish");
        let request = self
            .http
            .post(url)
            .headers(Self::headers(settings)?)
            .json(&PolishRequestBody { text, model_id });

        debug!(model_id, chars = text.chars().count(), "issuing polish request");

        tokio::select! {
            _ = cancel.cancelled() => Err(JobError::Cancelled),
            outcome = tokio::time::timeout(self.request_timeout, Self::request_json(request)) => {
                match outcome {
                    Ok(result) => result,
                    Err(_) => Err(JobError::Transport(format!(
                        "polish request timed out after {}s",
                        self.request_timeout.as_secs()
                    ))),
                }
            }
        }
    }
}
