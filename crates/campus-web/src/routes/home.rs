//! Dashboard page.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;

use campus_core::DataSource;

use crate::render::{components::build_response, dashboard};
use crate::session::SessionContext;
use crate::state::AppState;

/// Render the dashboard with a freshly fetched user count. A failed count
/// shows as 0.
pub async fn dashboard(State(state): State<AppState>, session: SessionContext) -> Response {
    let user_count = state.user_count.load().await.into_ready().unwrap_or_default();

    let markup = dashboard::render(&state.config.site_name, &session.store.state(), user_count);
    build_response(StatusCode::OK, markup)
}
