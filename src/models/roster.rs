//! Moderator-facing roster payloads.

use serde::{Deserialize, Serialize};

use super::Submission;

/// Lifecycle phase of a roster view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RosterPhase {
    Uninitialized,
    Subscribed,
    Closed,
}

/// Point-in-time copy of a roster view as shown to the moderator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterSnapshot {
    pub phase: RosterPhase,
    /// True until the first snapshot has been applied
    pub loading: bool,
    /// Persistent subscription failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    pub pending_deletes: usize,
    /// Revision of the last applied store snapshot
    pub revision: i64,
    pub submissions: Vec<Submission>,
}

/// Result body for delete operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub confirmed: bool,
    pub deleted: usize,
}
