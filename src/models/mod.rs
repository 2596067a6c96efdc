//! Data models for the folio backend.
//!
//! These models match the frontend payloads for the intake form and admin dashboard.

mod auth;
mod roster;
mod submission;

pub use auth::*;
pub use roster::*;
pub use submission::*;
