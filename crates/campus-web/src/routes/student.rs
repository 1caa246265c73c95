//! Student detail and the simulated edit/delete actions.
//!
//! Detail pages come from the revalidating page set: pre-built ids are
//! served from memory, other ids are fetched on demand. Edits and deletes
//! are never sent upstream; they only produce a confirmation notice.

use axum::Form;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

use campus_core::student::SimulatedAction;
use campus_core::{LoadState, SessionState, Student, StudentEdit};

use crate::render::components::build_response;
use crate::render::student as view;
use crate::session::SessionContext;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    notice: Option<String>,
}

/// Resolve a raw path id to a student. Non-numeric ids, upstream not-found,
/// and failed fetches all come back as `None`.
async fn load_student(state: &AppState, raw_id: &str) -> Option<Student> {
    let id: u32 = raw_id.parse().ok()?;
    match state.profiles.load(id).await {
        LoadState::Ready(student) => student,
        LoadState::Failed(reason) => {
            tracing::warn!(id = id, reason = %reason, "student page unavailable");
            None
        }
        LoadState::Loading => None,
    }
}

fn not_found(state: &AppState, session: &SessionState, raw_id: &str) -> Response {
    build_response(
        StatusCode::NOT_FOUND,
        view::not_found(&state.config.site_name, session, raw_id),
    )
}

/// `GET /students/{id}`
pub async fn detail(
    State(state): State<AppState>,
    session: SessionContext,
    Path(raw_id): Path<String>,
    Query(query): Query<NoticeQuery>,
) -> Response {
    let student = load_student(&state, &raw_id).await;
    let snapshot = session.store.state();

    match student {
        Some(student) => {
            let notice = query.notice.as_deref().and_then(SimulatedAction::parse);
            let generated_at = state.profiles.generated_at(&student.id).await;
            build_response(
                StatusCode::OK,
                view::detail(
                    &state.config.site_name,
                    &snapshot,
                    &student,
                    notice,
                    generated_at,
                ),
            )
        }
        None => not_found(&state, &snapshot, &raw_id),
    }
}

/// `GET /students/{id}/edit`
pub async fn edit_form(
    State(state): State<AppState>,
    session: SessionContext,
    Path(raw_id): Path<String>,
) -> Response {
    let snapshot = session.store.state();
    let Some(student) = load_student(&state, &raw_id).await else {
        return not_found(&state, &snapshot, &raw_id);
    };

    let form = StudentEdit::from_student(&student);
    build_response(
        StatusCode::OK,
        view::edit_form(&state.config.site_name, &snapshot, student.id, &form, &[]),
    )
}

/// `POST /students/{id}/edit`: validate, then pretend to save.
pub async fn submit_edit(
    State(state): State<AppState>,
    session: SessionContext,
    Path(raw_id): Path<String>,
    Form(form): Form<StudentEdit>,
) -> Response {
    let snapshot = session.store.state();
    let Some(student) = load_student(&state, &raw_id).await else {
        return not_found(&state, &snapshot, &raw_id);
    };

    let errors = form.validate();
    if !errors.is_empty() {
        return build_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            view::edit_form(&state.config.site_name, &snapshot, student.id, &form, &errors),
        );
    }

    tracing::info!(id = student.id, submitted = ?form, "simulated student update");
    Redirect::to(&format!(
        "/students/{}?notice={}",
        student.id,
        SimulatedAction::Updated.as_str()
    ))
    .into_response()
}

/// `POST /students/{id}/delete`: pretend to delete and return to the list.
pub async fn delete(
    State(state): State<AppState>,
    session: SessionContext,
    Path(raw_id): Path<String>,
) -> Response {
    let Some(student) = load_student(&state, &raw_id).await else {
        return not_found(&state, &session.store.state(), &raw_id);
    };

    tracing::info!(id = student.id, "simulated student delete");
    Redirect::to(&format!(
        "/students?notice={}",
        SimulatedAction::Deleted.as_str()
    ))
    .into_response()
}
