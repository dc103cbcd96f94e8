//! HTTP server for the Prometheus metrics endpoint and a status probe.
//!
//! Runs on a separate tokio task and serves `/metrics` for Prometheus scraping
//! and `/status` with a JSON snapshot of the engine.

use crate::engine::{Engine, EngineStatus};
use axum::{Json, Router, extract::State, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;

/// Handler for GET /metrics - returns Prometheus metrics in text format.
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

/// Handler for GET /status.
async fn status_handler(State(engine): State<Arc<Engine>>) -> Json<EngineStatus> {
    Json(engine.status().await)
}

pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/status", get(status_handler))
        .with_state(engine)
}

/// Run the HTTP server.
///
/// Binds to `0.0.0.0:port`. This is a long-running task that should be
/// spawned in the background.
pub async fn run_http_server(port: u16, engine: Arc<Engine>) {
    let app = router(engine);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Prometheus HTTP server listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind HTTP server on {}: {}", addr, e);
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("HTTP server error: {}", e);
    }
}
