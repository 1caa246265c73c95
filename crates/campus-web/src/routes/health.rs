//! Health check endpoint.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    active_sessions: u64,
    prebuilt_pages: usize,
}

/// Public health check endpoint.
///
/// Returns basic service health for load balancer health checks. Never touches the
/// demo API.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "campus-web",
        version: env!("CARGO_PKG_VERSION"),
        active_sessions: state.sessions.active_count(),
        prebuilt_pages: state.profiles.len(),
    })
}
