//! Remote task/document API
//!
//! [`DocumentApi`] is the seam between the coordinator and the anonymization
//! server. [`HttpDocumentApi`] is the reqwest-backed implementation; tests and
//! embedders can provide their own.

mod http;

pub use http::HttpDocumentApi;

use crate::types::{Destination, DocumentId, TaskId, TaskStatus};
use async_trait::async_trait;

/// Operations the coordinator needs from the anonymization server
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Query the status of the async task processing `document`
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be sent or the server
    /// answered with a non-success status.
    async fn check_status(
        &self,
        document: &DocumentId,
        task_id: &TaskId,
    ) -> crate::Result<TaskStatus>;

    /// Fetch the anonymized artifact of `document`
    ///
    /// `task_id` is absent when the job completed without an async task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`](crate::Error::Http) with status 409 while the
    /// artifact is not produced yet, and other errors for transport or server
    /// failures.
    async fn fetch_artifact(
        &self,
        document: &DocumentId,
        filename: &str,
        task_id: Option<&TaskId>,
    ) -> crate::Result<Vec<u8>>;

    /// Publish the already produced artifact of `document` to `destination`
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be sent or the server
    /// answered with a non-success status.
    async fn publish(&self, document: &DocumentId, destination: Destination) -> crate::Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str {
        "document-api"
    }
}
