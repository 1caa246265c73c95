//! Campus Web - server-rendered academic dashboard.
//!
//! Every browser session gets its own state store (theme, login flag, user
//! name, major filter) that all pages read from. Pages pull their data from
//! the public demo API with three different strategies:
//!
//! - **Request-time**: the dashboard user count and the student listing are
//!   fetched on every request, before the page is rendered
//! - **Revalidating**: student detail pages are built ahead of time for the
//!   first few ids, served from memory, and refreshed in the background once
//!   stale; other ids are built on first request
//! - **Post-render**: the recent-students card is rendered as a placeholder
//!   and filled in by the browser from `/fragments/recent-students`
//!
//! # Session
//!
//! - `campus_session` cookie (HttpOnly) identifies the session
//! - `app_theme` cookie mirrors the persisted theme so a new session starts
//!   with the last chosen theme
//! - `/events/session` pushes a `session` event on every change so open tabs
//!   re-render
//!
//! # Security
//!
//! - All dynamic content is HTML-escaped by maud
//! - `return_to` redirects accept same-site paths only
//! - Content-Security-Policy allows the single inline page script

pub mod config;
pub mod error;
pub mod render;
pub mod routes;
pub mod session;
pub mod state;

pub use config::Config;
pub use routes::router;
pub use state::AppState;
