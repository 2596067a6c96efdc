//! Operator confirmation for destructive roster actions.

use std::future::Future;

/// What the operator is being asked to approve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmPrompt {
    DeleteOne { id: String },
    DeleteAll,
}

impl ConfirmPrompt {
    pub fn message(&self) -> &'static str {
        match self {
            ConfirmPrompt::DeleteOne { .. } => "Are you sure you want to delete this submission?",
            ConfirmPrompt::DeleteAll => {
                "Are you sure you want to delete ALL submissions? This action cannot be undone."
            }
        }
    }
}

/// Source of a yes/no answer. Nothing is deleted until it answers `true`.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &ConfirmPrompt) -> impl Future<Output = bool> + Send;
}

/// An answer given up front, e.g. a `confirm=true` request flag.
impl Confirm for bool {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        tracing::debug!(prompt = prompt.message(), confirmed = *self, "Confirmation");
        *self
    }
}
