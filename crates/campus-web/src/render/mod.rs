//! HTML rendering for the dashboard pages.
//!
//! All rendering uses [maud](https://maud.lambda.xyz/) for compile-time HTML
//! generation with automatic escaping of dynamic values. Every page takes
//! the session snapshot it is bound to; nothing here reads shared state.

pub mod components;
pub mod dashboard;
pub mod student;
pub mod students;
