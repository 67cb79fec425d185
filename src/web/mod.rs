//! HTTP surface: router construction and server lifecycle.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::services::StreamAnalyzer;

pub mod handlers;
pub mod responses;

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<StreamAnalyzer>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .route("/api/analyze", post(handlers::analyze::analyze))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(config: &Config) -> Result<()> {
    let analyzer = StreamAnalyzer::new(config).context("failed to initialize analyzer")?;
    let state = AppState {
        analyzer: Arc::new(analyzer),
    };
    let app = create_router(state);

    let addr = format!("{}:{}", config.web.host, config.web.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
