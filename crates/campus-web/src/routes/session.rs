//! Session mutations: theme, login, logout, plus a JSON snapshot.
//!
//! Mutations are form posts that redirect back to the page they came from
//! (`return_to`, same-site paths only).

use axum::extract::State;
use axum::response::Redirect;
use axum::{Form, Json};
use serde::Deserialize;

use campus_core::SessionState;

use crate::error::WebError;
use crate::render::components::safe_return_to;
use crate::session::SessionContext;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ReturnTo {
    #[serde(default)]
    return_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ThemeForm {
    #[serde(default)]
    theme: Option<String>,
    #[serde(default)]
    return_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    major: Option<String>,
    #[serde(default)]
    return_to: Option<String>,
}

/// `POST /theme/toggle`
pub async fn toggle_theme(session: SessionContext, Form(form): Form<ReturnTo>) -> Redirect {
    session.store.toggle_theme();
    Redirect::to(safe_return_to(form.return_to.as_deref()))
}

/// `POST /theme`: values other than `light`/`dark` are ignored.
pub async fn set_theme(session: SessionContext, Form(form): Form<ThemeForm>) -> Redirect {
    session.store.set_theme(form.theme.as_deref().unwrap_or_default());
    Redirect::to(safe_return_to(form.return_to.as_deref()))
}

/// `POST /login`
pub async fn login(session: SessionContext, Form(form): Form<LoginForm>) -> Redirect {
    session
        .store
        .login(form.name.as_deref(), form.major.as_deref());
    Redirect::to(safe_return_to(form.return_to.as_deref()))
}

/// `POST /logout`
pub async fn logout(session: SessionContext, Form(form): Form<ReturnTo>) -> Redirect {
    session.store.logout();
    Redirect::to(safe_return_to(form.return_to.as_deref()))
}

/// `GET /api/session`: state of the session as the registry holds it. A
/// session that ended while the request was in flight is a 500.
pub async fn snapshot(
    State(state): State<AppState>,
    session: SessionContext,
) -> Result<Json<SessionState>, WebError> {
    let live = state.sessions.get(&session.id).await?;
    Ok(Json(live.store.state()))
}
