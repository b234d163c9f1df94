//! Health check endpoint

use axum::{Json, Router, routing::get};
use serde::Serialize;

/// Liveness response
#[derive(Serialize)]
pub struct HealthResponse {
    pub service: &'static str,
    pub status: &'static str,
    pub version: &'static str,
}

/// Liveness probe: the process is up and serving
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: "herald",
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build health router (stateless)
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}
