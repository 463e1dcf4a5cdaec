use std::borrow::Borrow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use uuid::Uuid;

/// Opaque token linking a submitted job to its eventual worker response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a fresh id for an incoming request.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for CorrelationId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Lifecycle status of a tracked job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Completed and failed are final; nothing moves a job out of them.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// A job the gateway has handed to the worker pool and is waiting on.
#[derive(Debug, Clone, Serialize)]
pub struct PendingRequest {
    pub correlation_id: CorrelationId,
    pub status: JobStatus,
    pub progress: Option<u8>,
    pub hostname: Option<String>,
    pub result_key: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl PendingRequest {
    pub fn new(correlation_id: CorrelationId) -> Self {
        let now = Utc::now();
        Self {
            correlation_id,
            status: JobStatus::Processing,
            progress: None,
            hostname: None,
            result_key: None,
            error: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
        }
    }
}

/// A change reported by a worker for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: JobStatus,
    pub progress: Option<u8>,
    pub hostname: Option<String>,
    pub result_key: Option<String>,
    pub error: Option<String>,
}

impl StatusUpdate {
    pub fn progress(progress: u8) -> Self {
        Self {
            status: JobStatus::Processing,
            progress: Some(progress),
            hostname: None,
            result_key: None,
            error: None,
        }
    }

    pub fn completed(result_key: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Completed,
            progress: None,
            hostname: None,
            result_key: Some(result_key.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            progress: None,
            hostname: None,
            result_key: None,
            error: Some(error.into()),
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }
}

/// Result message published by a worker on the response topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMessage {
    #[serde(default)]
    pub correlation_id: Option<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: Option<u32>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub result_object_key: Option<String>,
    #[serde(default)]
    pub error_detail: Option<String>,
}

impl ResultMessage {
    /// Split the message into its correlation id and the update it carries.
    pub fn into_update(self) -> (Option<CorrelationId>, StatusUpdate) {
        let update = StatusUpdate {
            status: self.status,
            progress: self.progress.map(|p| p.min(100) as u8),
            hostname: self.hostname,
            result_key: self.result_object_key,
            error: self.error_detail,
        };
        (self.correlation_id.map(CorrelationId::from), update)
    }
}
