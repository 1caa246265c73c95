//! Route definitions for the dashboard.
//!
//! ## Routes
//!
//! Session-bound (behind [`require_session`]):
//!
//! - `GET /` - Dashboard
//! - `GET /students` - Student listing (`q`, `page`, `size`, `notice`)
//! - `POST /students/filter` - Set/clear the selected major
//! - `GET /students/{id}` - Student detail (`notice`)
//! - `GET|POST /students/{id}/edit` - Simulated edit
//! - `POST /students/{id}/delete` - Simulated delete
//! - `POST /theme/toggle`, `POST /theme` - Theme
//! - `POST /login`, `POST /logout` - Session simulation
//! - `GET /api/session` - Session snapshot (JSON)
//! - `GET /events/session` - Session change events (SSE)
//! - `GET /fragments/recent-students` - Post-render fragment
//!
//! Open:
//!
//! - `GET /health` - Health check (JSON)

mod events;
mod fragments;
mod health;
mod home;
mod session;
mod student;
mod students;

use axum::Router;
use axum::http::Uri;
use axum::middleware;
use axum::routing::{get, post};

use crate::error::WebError;
use crate::session::require_session;
use crate::state::AppState;

/// Build the complete router.
pub fn router(state: AppState) -> Router {
    let pages = Router::new()
        .route("/", get(home::dashboard))
        .route("/students", get(students::list))
        .route("/students/filter", post(students::set_filter))
        .route("/students/{id}", get(student::detail))
        .route(
            "/students/{id}/edit",
            get(student::edit_form).post(student::submit_edit),
        )
        .route("/students/{id}/delete", post(student::delete))
        .route("/theme/toggle", post(session::toggle_theme))
        .route("/theme", post(session::set_theme))
        .route("/login", post(session::login))
        .route("/logout", post(session::logout))
        .route("/api/session", get(session::snapshot))
        .route("/events/session", get(events::session_events))
        .route(
            "/fragments/recent-students",
            get(fragments::recent_students),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .merge(pages)
        .route("/health", get(health::health_check))
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> WebError {
    WebError::NotFound(uri.path().to_string())
}
