use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::StreamExt;
use tracing::{error, warn};

use crate::errors::RelayError;
use crate::models::{ChatRequest, ModelInfo, AVAILABLE_MODELS};
use crate::service::relay_service::RelayService;

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST `/api/chat`: relays the chat history upstream and streams deltas back
/// as `text/event-stream`.
pub async fn chat_handler(State(svc): State<RelayService>, body: Bytes) -> Response {
    let request: ChatRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => return error_response(RelayError::InvalidBody(e)),
    };

    match svc.relay(request).await {
        Ok(frames) => {
            let body = Body::from_stream(frames.map(Ok::<_, std::convert::Infallible>));
            (
                StatusCode::OK,
                [
                    (CONTENT_TYPE, "text/event-stream"),
                    (CACHE_CONTROL, "no-cache"),
                    (CONNECTION, "keep-alive"),
                ],
                body,
            )
                .into_response()
        }
        Err(err) => error_response(err),
    }
}

/// GET `/api/stats`: relay counters as JSON
pub async fn stats_handler(State(svc): State<RelayService>) -> impl IntoResponse {
    Json(svc.stats())
}

/// GET `/api/models`: models the client may pick from
pub async fn models_handler() -> impl IntoResponse {
    let models: Vec<ModelInfo> = AVAILABLE_MODELS
        .iter()
        .map(|&(id, name)| ModelInfo { id, name })
        .collect();
    Json(models)
}

// ── Helper ────────────────────────────────────────────────────────────────────

fn error_response(err: RelayError) -> Response {
    match &err {
        RelayError::MissingApiKey => error!("Refusing chat request: {err}"),
        RelayError::UpstreamRejected { .. } => warn!("Upstream rejected chat request: {err}"),
        _ => error!("Chat relay failed: {err:?}"),
    }
    err.into_response()
}
