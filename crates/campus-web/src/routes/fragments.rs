//! Fragments requested by the browser after a page is shown.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;

use crate::render::{components::build_response, dashboard};
use crate::state::AppState;

/// Recent students for the dashboard card.
///
/// The fetch runs in its own task; if the client goes away before it
/// settles, dropping this handler's future cancels it.
pub async fn recent_students(State(state): State<AppState>) -> Response {
    let load = state.recent.start();
    let settled = load.settled().await;
    build_response(StatusCode::OK, dashboard::recent_students(&settled))
}
