//! Core types and events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of the document a job runs on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    /// Create a document id from anything string-like
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the asynchronous processing task on the server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Create a task id from anything string-like
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The document a job is processing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Server-side identifier
    pub id: DocumentId,
    /// Original file name, used to derive the download file name
    pub name: String,
}

impl Document {
    /// Create a document reference
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: DocumentId::new(id),
            name: name.into(),
        }
    }
}

/// Remote task status as reported by the status endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    /// Finished successfully, the artifact can be fetched
    Success,
    /// The server-side task failed
    Failure,
    /// Still running (also covers any non-terminal state the server reports)
    #[serde(other)]
    Pending,
}

impl TaskStatus {
    /// Whether this status ends polling
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failure)
    }
}

/// Body of the status endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    /// Current task status
    pub status: TaskStatus,
}

/// External destination a finished document can be published to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// The user's Dropbox account
    Dropbox,
    /// The user's Google Drive account
    GoogleDrive,
}

impl Destination {
    /// Path segment used by the publish endpoint
    pub fn path_segment(self) -> &'static str {
        match self {
            Destination::Dropbox => "dropbox",
            Destination::GoogleDrive => "drive",
        }
    }

    /// Human-readable name of the destination
    pub fn display_name(self) -> &'static str {
        match self {
            Destination::Dropbox => "Dropbox",
            Destination::GoogleDrive => "Google Drive",
        }
    }
}

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    /// Operation succeeded
    Success,
    /// Operation failed
    Error,
}

/// A transient user-facing message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Severity
    pub level: NotificationLevel,
    /// Message shown to the user
    pub message: String,
}

/// Why a polling session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A terminal status (or a failed status check) was applied
    Terminal,
    /// The tracked task id changed or was cleared
    TaskChanged,
    /// The result view was torn down
    Teardown,
}

/// Events emitted while a result view is mounted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Polling started for a task
    PollingStarted {
        /// Task being polled
        task_id: TaskId,
    },

    /// A status check returned
    StatusChecked {
        /// Task that was checked
        task_id: TaskId,
        /// Reported status
        status: TaskStatus,
        /// When the response was applied
        checked_at: DateTime<Utc>,
    },

    /// The task finished and the artifact is ready
    JobCompleted {
        /// Completed task
        task_id: TaskId,
    },

    /// The job failed (server-side failure or unreachable status endpoint)
    JobFailed {
        /// Failed task
        task_id: TaskId,
        /// Message shown in the error view
        message: String,
        /// Error code shown in the error view
        code: u16,
    },

    /// A response arrived for a task that is no longer tracked and was dropped
    StaleResponseDiscarded {
        /// Task the late response belonged to
        task_id: TaskId,
    },

    /// Polling stopped
    PollingStopped {
        /// Task that was being polled
        task_id: TaskId,
        /// Why polling stopped
        reason: StopReason,
    },

    /// A notification was published by the default notifier
    Notification(Notification),

    /// The user confirmed a reset and the job state was cleared
    ResetConfirmed,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_response_parses_server_values() {
        let cases = [
            (r#"{"status":"PENDING"}"#, TaskStatus::Pending),
            (r#"{"status":"SUCCESS"}"#, TaskStatus::Success),
            (r#"{"status":"FAILURE"}"#, TaskStatus::Failure),
        ];
        for (body, expected) in cases {
            let parsed: StatusResponse = serde_json::from_str(body).unwrap();
            assert_eq!(parsed.status, expected, "body {body}");
        }
    }

    #[test]
    fn unknown_status_is_treated_as_pending() {
        let parsed: StatusResponse = serde_json::from_str(r#"{"status":"STARTED"}"#).unwrap();
        assert_eq!(parsed.status, TaskStatus::Pending);
        assert!(!parsed.status.is_terminal());
    }

    #[test]
    fn only_success_and_failure_are_terminal() {
        assert!(TaskStatus::Success.is_terminal());
        assert!(TaskStatus::Failure.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
    }

    #[test]
    fn destinations_map_to_distinct_segments() {
        assert_eq!(Destination::Dropbox.path_segment(), "dropbox");
        assert_eq!(Destination::GoogleDrive.path_segment(), "drive");
        assert_ne!(
            Destination::Dropbox.display_name(),
            Destination::GoogleDrive.display_name()
        );
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = Event::PollingStopped {
            task_id: TaskId::new("t1"),
            reason: StopReason::Terminal,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "polling_stopped");
        assert_eq!(json["task_id"], "t1");
        assert_eq!(json["reason"], "terminal");
    }
}
