//! Error types for the dashboard.
//!
//! Errors are rendered as small HTML pages since every route except the
//! JSON endpoints is user-facing HTML.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use maud::{DOCTYPE, PreEscaped, html};

use crate::render::components::ERROR_CSS;

/// Web layer error type.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// No route or record matches the request.
    #[error("not found: {0}")]
    NotFound(String),

    /// A handler asked for the session's state store but the session
    /// middleware never mounted one for this request.
    #[error("session state store is not initialized")]
    StoreNotInitialized,

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<campus_core::Error> for WebError {
    fn from(err: campus_core::Error) -> Self {
        if err.is_not_initialized() {
            Self::StoreNotInitialized
        } else {
            Self::Internal(err.into())
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, title, message) = match &self {
            Self::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "Not Found",
                format!("Nothing here: {what}"),
            ),
            Self::StoreNotInitialized => {
                tracing::error!("state store accessed outside the session middleware");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Session Not Initialized",
                    "The session state store is not initialized for this request.".to_string(),
                )
            }
            Self::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Error",
                    "An internal error occurred. Please try again later.".to_string(),
                )
            }
        };

        let markup = html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="utf-8";
                    meta name="viewport" content="width=device-width, initial-scale=1";
                    title { (title) " | Academic Dashboard" }
                    meta name="robots" content="noindex";
                    style { (PreEscaped(ERROR_CSS)) }
                }
                body {
                    main class="error-page" {
                        h1 { (title) }
                        p { (message) }
                        a href="/" { "Back to the dashboard" }
                    }
                }
            }
        };

        (status, markup).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_not_found() {
        let err = WebError::NotFound("/nowhere".to_string());
        assert_eq!(err.to_string(), "not found: /nowhere");
    }

    #[test]
    fn error_display_internal() {
        let err = WebError::Internal(anyhow::anyhow!("something broke"));
        assert_eq!(err.to_string(), "internal error: something broke");
    }

    #[test]
    fn core_not_initialized_maps_to_store_error() {
        let err = WebError::from(campus_core::Error::NotInitialized);
        assert!(matches!(err, WebError::StoreNotInitialized));

        let err = WebError::from(campus_core::Error::Storage("disk".to_string()));
        assert!(matches!(err, WebError::Internal(_)));
    }

    #[test]
    fn error_into_response_statuses() {
        assert_eq!(
            WebError::NotFound("x".to_string()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            WebError::StoreNotInitialized.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            WebError::Internal(anyhow::anyhow!("boom"))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
