//! Error types for anonymizer-client
//!
//! This module provides the single error type used throughout the library:
//! - Remote API failures (HTTP status + optional server-provided detail)
//! - Transport failures from the HTTP client
//! - Local failures (configuration, I/O, serialization)
//! - Job-state misuse (attaching a second task to the same job, accepting a
//!   submission that is not in progress)
//!
//! None of these propagate out of the poller or the action gate: they are
//! translated into a [`JobError`](crate::state::JobError) or a notification
//! at the point of call.

use crate::types::TaskId;
use thiserror::Error;

/// Result type alias for anonymizer-client operations
pub type Result<T> = std::result::Result<T, Error>;

/// HTTP status the remote API uses when an artifact is not produced yet
pub const CONFLICT_STATUS: u16 = 409;

/// Main error type for anonymizer-client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api.base_url")
        key: Option<String>,
    },

    /// The remote API answered with a non-success status
    #[error("remote API returned HTTP {status}{}", detail_suffix(.detail))]
    Http {
        /// HTTP status code of the response
        status: u16,
        /// `detail` field of the JSON error body, if the server sent one
        detail: Option<String>,
    },

    /// Network error (connection refused, timeout, malformed response, ...)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A URL could not be built from the configured base URL
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error (writing a downloaded artifact)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A task id was attached to a job that already tracks one
    #[error("job already tracks task {existing}, refusing to attach {attempted}")]
    TaskAlreadyAttached {
        /// The task currently tracked
        existing: TaskId,
        /// The task that was rejected
        attempted: TaskId,
    },

    /// Operation requires a submitted document but the job state is empty
    #[error("no document is being tracked")]
    NoDocument,

    /// A submission result arrived while no submission was in progress
    #[error("no submission is in progress")]
    NotSubmitting,

    /// Other error
    #[error("{0}")]
    Other(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

impl Error {
    /// HTTP status associated with this error, if the server produced one
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            Error::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Server-provided detail message, if any
    pub fn detail(&self) -> Option<&str> {
        match self {
            Error::Http { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Whether the remote API reported that the artifact is not ready yet
    pub fn is_conflict(&self) -> bool {
        self.http_status() == Some(CONFLICT_STATUS)
    }
}
