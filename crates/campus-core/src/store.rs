//! Per-session state store.
//!
//! A [`StateStore`] holds the theme, login flag, user name, and selected major
//! of one browser session. It is constructed explicitly (see
//! [`crate::registry::SessionRegistry`]) and handed to views through the
//! request context; there is no global instance.
//!
//! The state lives in a `tokio::sync::watch` channel. Every mutator rewrites
//! the snapshot under the channel's lock and wakes subscribers, so a reader
//! only ever sees a whole snapshot from before or after a mutation.

use std::fmt;
use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use tokio::sync::watch;

use crate::storage::{self, LocalStorage};
use crate::theme::Theme;

/// User name shown while logged out.
pub const GUEST_NAME: &str = "Guest";

/// Name used by [`StateStore::login`] when the caller gives none.
pub const DEFAULT_LOGIN_NAME: &str = "Felix";

/// Major used by [`StateStore::login`] when the caller gives none.
pub const DEFAULT_LOGIN_MAJOR: &str = "smartphones";

/// Immutable snapshot of a session's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub theme: Theme,
    pub is_logged_in: bool,
    pub user_name: String,
    pub selected_major: Option<String>,
}

impl SessionState {
    /// Logged-out state with the given theme.
    pub fn guest(theme: Theme) -> Self {
        Self {
            theme,
            is_logged_in: false,
            user_name: GUEST_NAME.to_string(),
            selected_major: None,
        }
    }

    /// Logged out ⇔ the user is called "Guest".
    pub fn is_consistent(&self) -> bool {
        self.is_logged_in != (self.user_name == GUEST_NAME)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::guest(Theme::default())
    }
}

/// Shared handle to one session's state. Clones refer to the same state.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<Inner>,
}

struct Inner {
    state: watch::Sender<SessionState>,
    storage: Option<Arc<dyn LocalStorage>>,
}

impl StateStore {
    /// Create a store, restoring the theme from `storage` when available.
    pub fn new(storage: Option<Arc<dyn LocalStorage>>) -> Self {
        let theme = storage::load_theme(storage.as_deref());
        let (state, _) = watch::channel(SessionState::guest(theme));

        Self {
            inner: Arc::new(Inner { state, storage }),
        }
    }

    /// Current snapshot.
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Register a listener. The receiver wakes after every effective mutation;
    /// the snapshot current at subscription time counts as already seen.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Flip light ↔ dark and persist the new value.
    pub fn toggle_theme(&self) {
        let mut theme = Theme::default();
        self.inner.state.send_modify(|state| {
            state.theme = state.theme.toggled();
            theme = state.theme;
        });
        record_mutation("toggle_theme");
        storage::persist_theme(self.inner.storage.as_deref(), theme);
    }

    /// Set the theme from its string form. Values other than `"light"` and
    /// `"dark"` are ignored.
    pub fn set_theme(&self, value: &str) {
        match value.parse::<Theme>() {
            Ok(theme) => self.apply_theme(theme),
            Err(e) => tracing::debug!(error = %e, "ignoring theme change"),
        }
    }

    /// Set the theme; no-op when it is already current.
    pub fn apply_theme(&self, theme: Theme) {
        let changed = self.inner.state.send_if_modified(|state| {
            if state.theme == theme {
                return false;
            }
            state.theme = theme;
            true
        });

        if changed {
            record_mutation("set_theme");
            storage::persist_theme(self.inner.storage.as_deref(), theme);
        }
    }

    /// Log in. A missing or blank `name` becomes [`DEFAULT_LOGIN_NAME`] (so
    /// does `"Guest"`, which is reserved for the logged-out state); a missing
    /// or blank `major` becomes [`DEFAULT_LOGIN_MAJOR`].
    pub fn login(&self, name: Option<&str>, major: Option<&str>) {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty() && *n != GUEST_NAME)
            .unwrap_or(DEFAULT_LOGIN_NAME)
            .to_string();
        let major = major
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_LOGIN_MAJOR)
            .to_string();

        tracing::debug!(user = %name, major = %major, "login");
        self.inner.state.send_modify(move |state| {
            state.is_logged_in = true;
            state.user_name = name;
            state.selected_major = Some(major);
        });
        record_mutation("login");
    }

    /// Log out: back to "Guest" with no major filter. The theme is kept.
    pub fn logout(&self) {
        self.inner.state.send_modify(|state| {
            state.is_logged_in = false;
            state.user_name = GUEST_NAME.to_string();
            state.selected_major = None;
        });
        record_mutation("logout");
    }

    /// Set or clear the major filter, regardless of login state. A blank
    /// value clears it.
    pub fn set_selected_major(&self, major: Option<&str>) {
        let major = major
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        let changed = self.inner.state.send_if_modified(|state| {
            if state.selected_major == major {
                return false;
            }
            state.selected_major = major;
            true
        });

        if changed {
            record_mutation("set_selected_major");
        }
    }

    /// Number of live subscribers (open views bound to this store).
    pub fn subscriber_count(&self) -> usize {
        self.inner.state.receiver_count()
    }
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("state", &*self.inner.state.borrow())
            .field("has_storage", &self.inner.storage.is_some())
            .finish()
    }
}

fn record_mutation(op: &'static str) {
    counter!("store_mutations_total", "op" => op).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::BrokenStorage;
    use crate::storage::{MemoryStorage, THEME_STORAGE_KEY};
    use proptest::prelude::*;

    fn store() -> StateStore {
        StateStore::new(None)
    }

    #[test]
    fn new_store_is_guest_light() {
        let state = store().state();
        assert_eq!(state, SessionState::default());
        assert_eq!(state.theme, Theme::Light);
        assert!(!state.is_logged_in);
        assert_eq!(state.user_name, "Guest");
        assert_eq!(state.selected_major, None);
    }

    #[test]
    fn toggle_theme_twice_restores_original() {
        let store = store();
        let original = store.state().theme;
        store.toggle_theme();
        assert_ne!(store.state().theme, original);
        store.toggle_theme();
        assert_eq!(store.state().theme, original);
    }

    #[test]
    fn set_theme_rejects_invalid_value() {
        let store = store();
        store.set_theme("dark");
        store.set_theme("purple");
        assert_eq!(store.state().theme, Theme::Dark);
        store.set_theme("LIGHT");
        assert_eq!(store.state().theme, Theme::Dark);
    }

    #[test]
    fn login_without_arguments_uses_defaults() {
        let store = store();
        store.login(None, None);
        let state = store.state();
        assert!(state.is_logged_in);
        assert_eq!(state.user_name, "Felix");
        assert_eq!(state.selected_major.as_deref(), Some("smartphones"));
    }

    #[test]
    fn login_with_arguments() {
        let store = store();
        store.login(Some("Jane Doe"), Some("fragrances"));
        let state = store.state();
        assert_eq!(state.user_name, "Jane Doe");
        assert_eq!(state.selected_major.as_deref(), Some("fragrances"));
    }

    #[test]
    fn login_never_yields_logged_in_guest() {
        let store = store();
        store.login(Some("Guest"), None);
        assert_eq!(store.state().user_name, DEFAULT_LOGIN_NAME);
        store.login(Some("   "), Some(""));
        let state = store.state();
        assert_eq!(state.user_name, DEFAULT_LOGIN_NAME);
        assert_eq!(state.selected_major.as_deref(), Some(DEFAULT_LOGIN_MAJOR));
        assert!(state.is_consistent());
    }

    #[test]
    fn logout_resets_session_but_keeps_theme() {
        let store = store();
        store.toggle_theme();
        store.login(Some("Jane Doe"), Some("groceries"));
        store.logout();
        let state = store.state();
        assert_eq!(state, SessionState::guest(Theme::Dark));
    }

    #[test]
    fn selected_major_is_independent_of_login() {
        let store = store();
        store.set_selected_major(Some("groceries"));
        assert_eq!(store.state().selected_major.as_deref(), Some("groceries"));
        assert!(!store.state().is_logged_in);

        store.set_selected_major(Some("  "));
        assert_eq!(store.state().selected_major, None);

        store.set_selected_major(Some("laptops"));
        store.logout();
        assert_eq!(store.state().selected_major, None);
    }

    #[test]
    fn theme_survives_reload_through_storage() {
        let storage = MemoryStorage::new();
        let first = StateStore::new(Some(Arc::new(storage.clone())));
        first.set_theme("dark");
        assert_eq!(
            storage.get_item(THEME_STORAGE_KEY).unwrap().as_deref(),
            Some("dark")
        );

        let reloaded = StateStore::new(Some(Arc::new(storage)));
        assert_eq!(reloaded.state().theme, Theme::Dark);
        assert!(!reloaded.state().is_logged_in);
    }

    #[test]
    fn broken_storage_does_not_affect_mutations() {
        let store = StateStore::new(Some(Arc::new(BrokenStorage)));
        store.toggle_theme();
        assert_eq!(store.state().theme, Theme::Dark);
    }

    #[test]
    fn subscribers_are_notified_of_effective_mutations() {
        let store = store();
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store.toggle_theme();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().theme, Theme::Dark);

        store.set_theme("purple");
        store.set_theme("dark");
        assert!(!rx.has_changed().unwrap());

        store.login(None, None);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_logged_in);
    }

    #[test]
    fn clones_share_state() {
        let store = store();
        let view = store.clone();
        store.login(Some("Ada"), None);
        assert_eq!(view.state().user_name, "Ada");
        assert_eq!(view.subscriber_count(), 0);
        let _rx = view.subscribe();
        assert_eq!(store.subscriber_count(), 1);
    }

    #[test]
    fn concurrent_readers_never_see_torn_state() {
        let store = store();
        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 0..2_000 {
                    if i % 2 == 0 {
                        store.login(Some("Jane Doe"), Some("fragrances"));
                    } else {
                        store.logout();
                    }
                }
            })
        };

        for _ in 0..2_000 {
            let state = store.state();
            assert!(state.is_consistent(), "torn state observed: {state:?}");
            if !state.is_logged_in {
                assert_eq!(state.selected_major, None);
            }
        }
        writer.join().unwrap();
    }

    #[derive(Debug, Clone)]
    enum Op {
        Login(Option<String>, Option<String>),
        Logout,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        let name = proptest::option::of(prop_oneof![
            Just("Guest".to_string()),
            Just(String::new()),
            "[A-Za-z ]{1,12}",
        ]);
        let major = proptest::option::of("[a-z-]{0,10}");
        prop_oneof![
            (name, major).prop_map(|(n, m)| Op::Login(n, m)),
            Just(Op::Logout),
        ]
    }

    proptest! {
        #[test]
        fn login_logout_sequences_keep_invariant(ops in proptest::collection::vec(op_strategy(), 0..40)) {
            let store = StateStore::new(None);
            for op in ops {
                match op {
                    Op::Login(name, major) => store.login(name.as_deref(), major.as_deref()),
                    Op::Logout => store.logout(),
                }
                let state = store.state();
                prop_assert!(state.is_consistent());
                if !state.is_logged_in {
                    prop_assert_eq!(state.user_name.as_str(), GUEST_NAME);
                    prop_assert_eq!(state.selected_major, None);
                } else {
                    prop_assert!(state.selected_major.is_some());
                }
            }
        }
    }
}
