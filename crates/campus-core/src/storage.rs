//! Local-storage style key/value persistence for the theme preference.
//!
//! The store never assumes storage exists: it holds an
//! `Option<Arc<dyn LocalStorage>>`, and every read or write goes through the
//! guarded helpers here. Failures are logged and swallowed.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::theme::Theme;

/// Storage key holding `"light"` or `"dark"`.
pub const THEME_STORAGE_KEY: &str = "app_theme";

/// A string key/value store that survives reloads (browser local storage,
/// a cookie jar, an in-memory map in tests).
pub trait LocalStorage: Send + Sync + fmt::Debug {
    /// Read a value, `Ok(None)` when the key is absent.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
}

/// In-memory storage. Clones share the same map, so a clone handed to a
/// second store behaves like the same browser's storage after a reload.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Read the persisted theme, falling back to the default when storage is
/// missing, unreadable, or holds something other than `light`/`dark`.
pub fn load_theme(storage: Option<&dyn LocalStorage>) -> Theme {
    let Some(storage) = storage else {
        return Theme::default();
    };

    match storage.get_item(THEME_STORAGE_KEY) {
        Ok(Some(value)) => Theme::parse(&value).unwrap_or_else(|| {
            tracing::debug!(value = %value, "ignoring unrecognized stored theme");
            Theme::default()
        }),
        Ok(None) => Theme::default(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read stored theme");
            Theme::default()
        }
    }
}

/// Best-effort write of the theme. Never fails.
pub fn persist_theme(storage: Option<&dyn LocalStorage>, theme: Theme) {
    let Some(storage) = storage else {
        tracing::debug!(theme = %theme, "no storage available, theme not persisted");
        return;
    };

    if let Err(e) = storage.set_item(THEME_STORAGE_KEY, theme.as_str()) {
        tracing::warn!(error = %e, theme = %theme, "failed to persist theme");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Error;

    /// Storage that rejects every operation.
    #[derive(Debug, Default)]
    pub(crate) struct BrokenStorage;

    impl LocalStorage for BrokenStorage {
        fn get_item(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::Storage("storage disabled".to_string()))
        }

        fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::Storage("quota exceeded".to_string()))
        }
    }

    #[test]
    fn memory_storage_round_trip_is_shared_between_clones() {
        let storage = MemoryStorage::new();
        let reloaded = storage.clone();
        storage.set_item("k", "v").unwrap();
        assert_eq!(reloaded.get_item("k").unwrap().as_deref(), Some("v"));
        assert_eq!(reloaded.get_item("missing").unwrap(), None);
    }

    #[test]
    fn load_theme_without_storage_is_default() {
        assert_eq!(load_theme(None), Theme::Light);
    }

    #[test]
    fn load_theme_reads_valid_value() {
        let storage = MemoryStorage::new();
        storage.set_item(THEME_STORAGE_KEY, "dark").unwrap();
        assert_eq!(load_theme(Some(&storage)), Theme::Dark);
    }

    #[test]
    fn load_theme_ignores_garbage() {
        let storage = MemoryStorage::new();
        storage.set_item(THEME_STORAGE_KEY, "purple").unwrap();
        assert_eq!(load_theme(Some(&storage)), Theme::Light);
    }

    #[test]
    fn load_theme_swallows_read_failure() {
        assert_eq!(load_theme(Some(&BrokenStorage)), Theme::Light);
    }

    #[test]
    fn persist_theme_writes_key() {
        let storage = MemoryStorage::new();
        persist_theme(Some(&storage), Theme::Dark);
        assert_eq!(
            storage.get_item(THEME_STORAGE_KEY).unwrap().as_deref(),
            Some("dark")
        );
    }

    #[test]
    fn persist_theme_swallows_failures() {
        persist_theme(Some(&BrokenStorage), Theme::Dark);
        persist_theme(None, Theme::Dark);
    }
}
