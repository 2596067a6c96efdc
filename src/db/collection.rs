//! The remote collection contract consumed by intake and roster.
//!
//! Implementations must publish a full snapshot after every write, in the
//! order the writes were applied.

use std::future::Future;

use tokio::sync::broadcast;

use crate::models::{Service, Status, Submission};

/// Opaque store-assigned identifier.
pub type SubmissionId = String;

/// How a timestamp field is filled at write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTime {
    /// Stamp the field with the store's own clock.
    ServerTime,
}

/// Field set for a create request.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub name: String,
    pub email: String,
    pub service: Service,
    pub message: String,
    pub status: Status,
    pub timestamp: WriteTime,
}

/// Full, ordered contents of the collection at one revision.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub revision: i64,
    /// Newest first
    pub submissions: Vec<Submission>,
}

/// A standing query: the state at registration plus every later snapshot.
///
/// Dropping the receiver cancels the query.
#[derive(Debug)]
pub struct Subscription {
    pub initial: Snapshot,
    pub updates: broadcast::Receiver<Snapshot>,
}

#[derive(Debug)]
pub enum StoreError {
    Database(sqlx::Error),
    NotFound(String),
    Rejected(String),
    Corrupt(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(err) => write!(f, "database error: {}", err),
            StoreError::NotFound(id) => write!(f, "submission {} not found", id),
            StoreError::Rejected(reason) => write!(f, "write rejected: {}", reason),
            StoreError::Corrupt(detail) => write!(f, "corrupt record: {}", detail),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err)
    }
}

/// Document collection holding submissions.
pub trait Collection: Send + Sync + 'static {
    /// Insert one document atomically and return its new identifier.
    fn create(
        &self,
        doc: NewSubmission,
    ) -> impl Future<Output = Result<SubmissionId, StoreError>> + Send;

    /// Register a standing query ordered by timestamp, newest first.
    fn subscribe(&self) -> impl Future<Output = Result<Subscription, StoreError>> + Send;

    /// Remove one document. Missing documents are an error.
    fn delete(&self, id: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Identifiers of every document currently stored.
    fn list_ids(&self) -> impl Future<Output = Result<Vec<SubmissionId>, StoreError>> + Send;
}
