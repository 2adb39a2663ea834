pub mod sse;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error};

use crate::config::RelayConfig;
use crate::errors::RelayError;
use crate::models::{ChatRequest, CompletionRequest, UpstreamErrorBody};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin client for an OpenAI-compatible `chat/completions` endpoint.
/// Only opens the streaming request; reading the body is left to the caller.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
}

impl UpstreamClient {
    pub fn new() -> Result<Self, RelayError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| RelayError::Unexpected(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Sends `request` upstream with streaming enabled and returns the response
    /// once its headers arrived with a success status.
    pub async fn open_stream(
        &self,
        config: &RelayConfig,
        request: &ChatRequest,
    ) -> Result<reqwest::Response, RelayError> {
        let api_key = config.api_key.as_deref().ok_or(RelayError::MissingApiKey)?;

        let body = CompletionRequest {
            model: request.resolved_model(),
            messages: &request.messages,
            temperature: request.resolved_temperature(),
            stream: true,
        };
        debug!(
            "Forwarding {} message(s) to {} (model {}, temperature {})",
            body.messages.len(),
            config.completions_url(),
            body.model,
            body.temperature
        );

        let send = self
            .http
            .post(config.completions_url())
            .bearer_auth(api_key)
            .json(&body)
            .send();

        let response = tokio::time::timeout(config.response_timeout, send)
            .await
            .map_err(|_| RelayError::UpstreamTimeout {
                secs: config.response_timeout.as_secs(),
            })?
            .map_err(|e| {
                error!("Upstream request to {} failed: {e}", config.completions_url());
                RelayError::UpstreamTransport(e)
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // The error body is best effort: anything unreadable or non-JSON falls
        // back to the status phrase.
        let text = response.text().await.unwrap_or_default();
        let parsed: UpstreamErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let message = parsed
            .error
            .and_then(|e| e.message)
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| "Unknown error".to_string());

        Err(RelayError::UpstreamRejected {
            status: status.as_u16(),
            message,
        })
    }
}

/// Process-wide relay counters, exposed through `GET /api/stats`.
#[derive(Debug, Default)]
pub struct RelayStats {
    requests: AtomicU64,
    upstream_errors: AtomicU64,
    frames_forwarded: AtomicU64,
    malformed_lines: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub upstream_errors: u64,
    pub frames_forwarded: u64,
    pub malformed_lines: u64,
}

impl RelayStats {
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_error(&self) {
        self.upstream_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame(&self) {
        self.frames_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed_lines.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            upstream_errors: self.upstream_errors.load(Ordering::Relaxed),
            frames_forwarded: self.frames_forwarded.load(Ordering::Relaxed),
            malformed_lines: self.malformed_lines.load(Ordering::Relaxed),
        }
    }
}
