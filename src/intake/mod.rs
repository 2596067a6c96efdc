//! Submission intake for the public "hire me" form.
//!
//! One validated request becomes exactly one create against the collection.
//! Nothing is retried and repeated calls are not de-duplicated.

use std::sync::Arc;

use crate::db::{Collection, NewSubmission, SubmissionId, WriteTime};
use crate::models::{Service, Status, SubmitRequest};

#[derive(Debug, PartialEq, Eq)]
pub enum IntakeError {
    /// Rejected before reaching the collection
    Validation(String),
    /// The create request failed; the cause has been logged
    Write,
}

impl std::fmt::Display for IntakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntakeError::Validation(msg) => write!(f, "invalid submission: {}", msg),
            IntakeError::Write => f.write_str("submission write failed"),
        }
    }
}

impl std::error::Error for IntakeError {}

pub struct Intake<C> {
    collection: Arc<C>,
}

impl<C: Collection> Intake<C> {
    pub fn new(collection: Arc<C>) -> Self {
        Self { collection }
    }

    /// Validate and store one submission, returning its new identifier.
    pub async fn submit(&self, request: &SubmitRequest) -> Result<SubmissionId, IntakeError> {
        let doc = validate(request)?;
        let service = doc.service;

        match self.collection.create(doc).await {
            Ok(id) => {
                tracing::info!(%id, service = service.as_str(), "Submission received");
                Ok(id)
            }
            Err(e) => {
                tracing::error!("Error submitting form: {}", e);
                Err(IntakeError::Write)
            }
        }
    }
}

/// Check required fields and build the create request.
pub fn validate(request: &SubmitRequest) -> Result<NewSubmission, IntakeError> {
    let name = required(&request.name, "Name")?;
    let email = required(&request.email, "Email")?;
    let service = required(&request.service, "Service")?;
    let message = required(&request.message, "Message")?;

    let service = Service::from_str(&service).ok_or_else(|| {
        IntakeError::Validation(format!("Service must be one of: web, app (got {:?})", service))
    })?;

    Ok(NewSubmission {
        name,
        email,
        service,
        message,
        status: Status::Pending,
        timestamp: WriteTime::ServerTime,
    })
}

fn required(value: &str, field: &str) -> Result<String, IntakeError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(IntakeError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}
