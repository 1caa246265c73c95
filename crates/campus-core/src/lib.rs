//! Core types and shared services for the Campus academic dashboard.
//!
//! This crate provides:
//! - The per-session state store (theme, login flag, user name, major filter)
//!   and the registry that mounts one store per browser session
//! - Guarded theme persistence over a local-storage style key/value interface
//! - Data sources for the three page-loading strategies (request-time,
//!   revalidating, post-render)
//! - The client for the public demo API and the student model built from it
//! - Prometheus metrics helpers
//! - Shared error types

pub mod api;
mod error;
pub mod metrics;
pub mod registry;
pub mod source;
pub mod storage;
pub mod store;
pub mod student;
pub mod theme;

pub use api::{DemoApi, HttpDemoApi, RemoteUser};
pub use error::{Error, Result};
pub use registry::{Session, SessionId, SessionRegistry};
pub use source::{
    DataSource, LoadState, PostRenderLoad, PostRenderSource, RequestTimeSource,
    RevalidatingPages, RevalidatingSource, Strategy,
};
pub use storage::{LocalStorage, MemoryStorage, THEME_STORAGE_KEY};
pub use store::{SessionState, StateStore};
pub use student::{Directory, Student, StudentEdit};
pub use theme::{Palette, Theme};
