pub mod api_routes;

use axum::routing::{get, post};
use axum::Router;

use crate::routes::api_routes::{chat_handler, models_handler, stats_handler};
use crate::service::relay_service::RelayService;

pub fn router(svc: RelayService) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/models", get(models_handler))
        .with_state(svc)
}
