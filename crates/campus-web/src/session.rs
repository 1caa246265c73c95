//! Per-browser sessions.
//!
//! Every page request passes through [`require_session`], which:
//!
//! 1. reads the `campus_session` cookie (issuing a fresh id when it is
//!    missing or malformed),
//! 2. mounts that session's [`StateStore`] in the registry, seeding theme
//!    storage from the browser's `app_theme` cookie,
//! 3. exposes the store to handlers as a [`SessionContext`] request
//!    extension,
//! 4. sends `Set-Cookie` for every stored value the browser's cookies do
//!    not match yet.
//!
//! The `app_theme` cookie is the browser's local storage: it outlives the
//! server-side session, so a returning browser gets its theme back while
//! login and filter state start fresh.

use std::collections::HashMap;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use parking_lot::Mutex;
use uuid::Uuid;

use campus_core::{LocalStorage, SessionId, StateStore, THEME_STORAGE_KEY};

use crate::error::WebError;
use crate::state::AppState;

/// Cookie carrying the session id.
pub const SESSION_COOKIE: &str = "campus_session";

/// Lifetime of storage cookies.
const STORAGE_COOKIE_MAX_AGE: u64 = 60 * 60 * 24 * 365;

/// Theme storage backed by the browser's cookies.
///
/// Reads come from the values the browser sent when the session was
/// mounted, updated by later writes. Writes reach the browser on any
/// response whose request carried an outdated cookie, so concurrent requests
/// of one session each get the value they are missing.
#[derive(Debug, Default)]
pub struct CookieStorage {
    values: Mutex<HashMap<String, String>>,
}

impl CookieStorage {
    /// Storage holding whatever theme cookie the browser sent.
    pub fn seeded(theme: Option<&str>) -> Self {
        let storage = Self::default();
        if let Some(theme) = theme {
            storage
                .values
                .lock()
                .insert(THEME_STORAGE_KEY.to_string(), theme.to_string());
        }
        storage
    }

    /// Stored values that differ from the cookies `sent` with a request.
    pub fn unsynced(&self, sent: &HashMap<String, String>) -> Vec<(String, String)> {
        let mut unsynced: Vec<_> = self
            .values
            .lock()
            .iter()
            .filter(|(key, value)| sent.get(*key) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        unsynced.sort();
        unsynced
    }
}

impl LocalStorage for CookieStorage {
    fn get_item(&self, key: &str) -> campus_core::Result<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> campus_core::Result<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The current request's session, as seen by handlers.
#[derive(Clone, Debug)]
pub struct SessionContext {
    pub id: SessionId,
    pub store: StateStore,
}

impl<S: Send + Sync> FromRequestParts<S> for SessionContext {
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .ok_or(WebError::StoreNotInitialized)
    }
}

/// Middleware that mounts the session's state store for every request.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let cookies = parse_cookies(request.headers());
    let known_id = cookies
        .get(SESSION_COOKIE)
        .and_then(|value| Uuid::parse_str(value).ok());
    let id = known_id.unwrap_or_else(Uuid::new_v4);

    let theme_cookie = cookies.get(THEME_STORAGE_KEY).cloned();
    let session = state
        .sessions
        .mount(id, move || CookieStorage::seeded(theme_cookie.as_deref()))
        .await;

    request.extensions_mut().insert(SessionContext {
        id,
        store: session.store.clone(),
    });

    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    if known_id.is_none() {
        tracing::debug!(session = %id, "issuing session cookie");
        append_cookie(
            headers,
            &format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax"),
        );
    }

    for (key, value) in session.storage.unsynced(&cookies) {
        append_cookie(
            headers,
            &format!("{key}={value}; Path=/; Max-Age={STORAGE_COOKIE_MAX_AGE}; SameSite=Lax"),
        );
    }

    response
}

fn append_cookie(headers: &mut HeaderMap, cookie: &str) {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            headers.append(SET_COOKIE, value);
        }
        Err(e) => tracing::warn!(error = %e, "skipping unencodable cookie"),
    }
}

/// Collect `name=value` pairs from every `Cookie` header. The first
/// occurrence of a name wins.
pub fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for header in headers.get_all(COOKIE) {
        let Ok(raw) = header.to_str() else {
            continue;
        };
        for pair in raw.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                cookies
                    .entry(name.trim().to_string())
                    .or_insert_with(|| value.trim().trim_matches('"').to_string());
            }
        }
    }
    cookies
}
