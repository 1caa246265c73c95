//! Error types for the Campus core services.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading data or accessing session state.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure talking to the demo API.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The demo API answered with a non-success status.
    #[error("unexpected status {status} from {url}")]
    Status {
        /// HTTP status code returned.
        status: u16,
        /// The URL that was requested.
        url: String,
    },

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A load did not settle within its deadline.
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The session state store was accessed before it was mounted.
    #[error("session state store is not initialized")]
    NotInitialized,

    /// A theme value other than `light` or `dark`.
    #[error("invalid theme '{0}'")]
    InvalidTheme(String),

    /// The theme storage backend rejected a read or write.
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Whether this error means the store was used outside a mounted session.
    pub fn is_not_initialized(&self) -> bool {
        matches!(self, Self::NotInitialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let err = Error::Status {
            status: 503,
            url: "https://dummyjson.com/users".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("https://dummyjson.com/users"));
    }

    #[test]
    fn test_not_initialized_is_distinguishable() {
        let err = Error::NotInitialized;
        assert!(err.is_not_initialized());
        assert_eq!(err.to_string(), "session state store is not initialized");

        let other = Error::Storage("quota exceeded".to_string());
        assert!(!other.is_not_initialized());
    }

    #[test]
    fn test_invalid_theme_display() {
        let err = Error::InvalidTheme("purple".to_string());
        assert_eq!(err.to_string(), "invalid theme 'purple'");
    }

    #[test]
    fn test_timeout_display() {
        let err = Error::Timeout(std::time::Duration::from_secs(5));
        assert_eq!(err.to_string(), "timed out after 5s");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
