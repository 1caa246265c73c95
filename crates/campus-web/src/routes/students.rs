//! Student listing and the major filter.

use axum::Form;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Redirect, Response};
use serde::Deserialize;

use campus_core::DataSource;
use campus_core::student::SimulatedAction;

use crate::render::components::{build_response, safe_return_to};
use crate::render::students::{self, ListingView};
use crate::session::SessionContext;
use crate::state::AppState;

/// Query string of `GET /students`. Numbers are parsed leniently: anything
/// unparsable falls back to the default.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    q: Option<String>,
    page: Option<String>,
    size: Option<String>,
    notice: Option<String>,
}

/// Render the listing from a freshly fetched directory. A failed fetch
/// renders an empty listing.
pub async fn list(
    State(state): State<AppState>,
    session: SessionContext,
    Query(query): Query<ListingQuery>,
) -> Response {
    let directory = state.directory.load().await.into_ready().unwrap_or_default();

    let view = ListingView {
        search: query.q.as_deref(),
        page: query.page.as_deref().and_then(|p| p.trim().parse().ok()),
        page_size: query.size.as_deref().and_then(|s| s.trim().parse().ok()),
        notice: query.notice.as_deref().and_then(SimulatedAction::parse),
    };

    let markup = students::render(
        &state.config.site_name,
        &session.store.state(),
        &directory,
        &view,
    );
    build_response(StatusCode::OK, markup)
}

#[derive(Debug, Deserialize)]
pub struct FilterForm {
    #[serde(default)]
    major: Option<String>,
    #[serde(default)]
    return_to: Option<String>,
}

/// Set or clear the session's selected major.
pub async fn set_filter(session: SessionContext, Form(form): Form<FilterForm>) -> Redirect {
    session.store.set_selected_major(form.major.as_deref());
    Redirect::to(safe_return_to(form.return_to.as_deref()))
}
