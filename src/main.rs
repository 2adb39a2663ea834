mod config;
mod errors;
mod models;
mod relay;
mod routes;
mod service;

use axum::http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{ConfigSource, RelayConfig};
use crate::relay::UpstreamClient;
use crate::service::relay_service::RelayService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hyper_chat=debug,tower_http=debug".into()),
        )
        .init();

    // ── Upstream ──────────────────────────────────────────────────────────────
    // The credential is looked up again on every request; this is only a hint.
    let startup = RelayConfig::from_env();
    if startup.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; chat requests will fail until it is");
    }
    info!("Relaying chat completions to {}", startup.completions_url());

    let upstream = UpstreamClient::new()?;
    let relay = RelayService::new(upstream, ConfigSource::Env);

    // ── Router ────────────────────────────────────────────────────────────────
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let app = routes::router(relay)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // ── Listen ────────────────────────────────────────────────────────────────
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}/");

    axum::serve(listener, app).await?;
    Ok(())
}
