//! Session registry: mounts one [`StateStore`] per browser session.
//!
//! The registry plays the part of the application shell. A store comes into
//! existence the first time its session is mounted and is dropped when the
//! session has been idle for the configured time. Looking up a session that
//! was never mounted (or has already ended) fails with
//! [`Error::NotInitialized`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge};
use moka::future::Cache;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::storage::LocalStorage;
use crate::store::StateStore;

/// Identifier of a browser session.
pub type SessionId = Uuid;

/// Default cap on concurrently mounted sessions.
pub const DEFAULT_SESSION_CAPACITY: u64 = 10_000;

/// A mounted session: its store plus the storage the store persists into.
pub struct Session<S> {
    pub id: SessionId,
    pub store: StateStore,
    pub storage: Arc<S>,
}

impl<S> Clone for Session<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            store: self.store.clone(),
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// Live sessions keyed by id, expiring after an idle period.
pub struct SessionRegistry<S> {
    sessions: Cache<SessionId, Session<S>>,
}

impl<S> Clone for SessionRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            sessions: self.sessions.clone(),
        }
    }
}

impl<S: LocalStorage + 'static> SessionRegistry<S> {
    /// Create a registry whose sessions end after `idle` without requests.
    pub fn new(idle: Duration, capacity: u64) -> Self {
        let sessions = Cache::builder()
            .max_capacity(capacity)
            .time_to_idle(idle)
            .eviction_listener(|id: Arc<SessionId>, _session, cause| {
                gauge!("sessions_active").decrement(1.0);
                tracing::debug!(session = %id, cause = ?cause, "session ended");
            })
            .build();

        tracing::info!(
            idle_secs = idle.as_secs(),
            capacity = capacity,
            "session registry initialized"
        );

        Self { sessions }
    }

    /// Return the session for `id`, mounting a fresh store over
    /// `storage()` if the session is not live. The theme is restored from
    /// that storage, everything else starts logged out.
    pub async fn mount(&self, id: SessionId, storage: impl FnOnce() -> S) -> Session<S> {
        self.sessions
            .get_with(id, async move {
                let storage = Arc::new(storage());
                let dyn_storage: Arc<dyn LocalStorage> = storage.clone();
                let store = StateStore::new(Some(dyn_storage));

                counter!("sessions_mounted_total").increment(1);
                gauge!("sessions_active").increment(1.0);
                tracing::debug!(session = %id, theme = %store.state().theme, "session mounted");

                Session { id, store, storage }
            })
            .await
    }

    /// Look up a live session. Fails fast with [`Error::NotInitialized`] if
    /// no store has been mounted for `id`.
    pub async fn get(&self, id: &SessionId) -> Result<Session<S>> {
        self.sessions.get(id).await.ok_or(Error::NotInitialized)
    }

    /// End a session immediately, dropping its store.
    pub async fn end(&self, id: &SessionId) {
        self.sessions.invalidate(id).await;
    }

    /// Approximate number of live sessions.
    pub fn active_count(&self) -> u64 {
        self.sessions.entry_count()
    }

    /// Apply pending expirations and bookkeeping.
    pub async fn sync(&self) {
        self.sessions.run_pending_tasks().await;
    }
}
