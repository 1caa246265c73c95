//! Server-sent events for session state changes.
//!
//! Each open page subscribes to its session's store. When any view of the
//! same session mutates the store (theme, login, filter), every other open
//! page receives a `session` event carrying the new snapshot and reloads.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use tokio::sync::watch;

use campus_core::SessionState;

use crate::session::SessionContext;

/// Stream one `session` event per store change. Ends when the session's
/// store is dropped.
pub async fn session_events(
    session: SessionContext,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = session.store.subscribe();
    tracing::debug!(
        session = %session.id,
        subscribers = session.store.subscriber_count(),
        "view subscribed"
    );

    let stream = state_changes(rx).map(|state| Ok(session_event(&state)));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Snapshots published after the receiver's current one.
fn state_changes(rx: watch::Receiver<SessionState>) -> impl Stream<Item = SessionState> {
    futures::stream::unfold(rx, |mut rx| async move {
        rx.changed().await.ok()?;
        let state = rx.borrow_and_update().clone();
        Some((state, rx))
    })
}

fn session_event(state: &SessionState) -> Event {
    let event = Event::default().event("session");
    match serde_json::to_string(state) {
        Ok(json) => event.data(json),
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode session snapshot");
            event
        }
    }
}
