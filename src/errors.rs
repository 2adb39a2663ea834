use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Shown to the user when the server has no upstream credential configured.
pub const MISSING_API_KEY_MESSAGE: &str =
    "APIキーが設定されていません。環境変数 OPENAI_API_KEY を確認してください。";

/// Opaque message for every failure that originates inside the relay.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Top-level relay error.
/// Variants that originate upstream keep their status and message; local
/// failures collapse into a generic 500 when rendered.
#[derive(Debug, Error)]
pub enum RelayError {
    // ── Configuration ────────────────────────────────────────────────────────
    #[error("upstream API key is not configured")]
    MissingApiKey,

    // ── Upstream ─────────────────────────────────────────────────────────────
    #[error("API Error: {status} - {message}")]
    UpstreamRejected { status: u16, message: String },

    #[error("Upstream request failed: {0}")]
    UpstreamTransport(#[source] reqwest::Error),

    #[error("Upstream did not respond within {secs}s")]
    UpstreamTimeout { secs: u64 },

    // ── Request ──────────────────────────────────────────────────────────────
    #[error("Invalid request body: {0}")]
    InvalidBody(#[source] serde_json::Error),

    // ── System ───────────────────────────────────────────────────────────────
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::UpstreamRejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The text placed in the `error` field of the response body.
    pub fn client_message(&self) -> String {
        match self {
            RelayError::MissingApiKey => MISSING_API_KEY_MESSAGE.to_string(),
            RelayError::UpstreamRejected { .. } => self.to_string(),
            _ => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }

    /// Whether the failure came from the upstream API rather than the relay.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            RelayError::UpstreamRejected { .. }
                | RelayError::UpstreamTransport(_)
                | RelayError::UpstreamTimeout { .. }
        )
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.client_message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_rejection_keeps_status_and_message() {
        let err = RelayError::UpstreamRejected {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.client_message(), "API Error: 429 - rate limited");
    }

    #[test]
    fn local_failures_are_opaque() {
        let err = RelayError::Unexpected("secret detail".to_string());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), INTERNAL_ERROR_MESSAGE);

        let err = RelayError::UpstreamTimeout { secs: 5 };
        assert_eq!(err.client_message(), INTERNAL_ERROR_MESSAGE);
    }

    #[test]
    fn upstream_failures_are_told_apart_from_local_ones() {
        assert!(RelayError::UpstreamTimeout { secs: 5 }.is_upstream());
        assert!(RelayError::UpstreamRejected {
            status: 500,
            message: "boom".to_string(),
        }
        .is_upstream());
        assert!(!RelayError::MissingApiKey.is_upstream());
        assert!(!RelayError::Unexpected("x".to_string()).is_upstream());
    }

    #[test]
    fn missing_key_is_localized_500() {
        let err = RelayError::MissingApiKey;
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), MISSING_API_KEY_MESSAGE);
    }
}
