//! Submission model matching the frontend "hire me" form.

use serde::{Deserialize, Serialize};

/// Kind of work requested by a lead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Web,
    App,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Web => "web",
            Service::App => "app",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "web" => Some(Service::Web),
            "app" => Some(Service::App),
            _ => None,
        }
    }
}

/// Moderation status. Submissions are written as `pending` and never transitioned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Status::Pending),
            _ => None,
        }
    }
}

/// A stored contact/work request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub name: String,
    pub email: String,
    pub service: Service,
    pub message: String,
    /// RFC 3339 time stamped by the store at creation
    pub timestamp: String,
    pub status: Status,
}

/// Request body for the public intake form.
///
/// Every field defaults to empty so that a missing field is reported as a
/// validation error instead of a body rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub message: String,
}

/// Response body for a successful submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub id: String,
}
