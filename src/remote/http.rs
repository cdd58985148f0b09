//! reqwest-backed [`DocumentApi`]

use super::DocumentApi;
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::types::{Destination, DocumentId, StatusResponse, TaskId, TaskStatus};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

/// JSON error body returned by the server (`{"detail": "..."}`)
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// HTTP client for the anonymization server
///
/// Endpoints, relative to the configured base URL:
/// - `GET documents/{id}/tasks/{task_id}/status`
/// - `GET documents/{id}/download?filename=..&task_id=..`
/// - `POST documents/{id}/publish/{dropbox|drive}`
#[derive(Clone, Debug)]
pub struct HttpDocumentApi {
    client: reqwest::Client,
    base_url: Url,
    auth_header: Option<String>,
}

impl HttpDocumentApi {
    /// Create a client from the API configuration
    ///
    /// # Errors
    /// Returns an error if the base URL does not parse or the HTTP client
    /// cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url)?;
        // Url::join drops the last segment unless the base ends with a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            auth_header: config.auth_header.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let path = segments
            .iter()
            .map(|s| urlencoding::encode(s).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        Ok(self.base_url.join(&path)?)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_header {
            Some(auth) => request.header(reqwest::header::AUTHORIZATION, auth),
            None => request,
        }
    }

    /// Send a request and turn non-success statuses into [`Error::Http`]
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = self.authorize(request).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.detail);
        debug!(status = status.as_u16(), detail = ?detail, "remote API returned an error");

        Err(Error::Http {
            status: status.as_u16(),
            detail,
        })
    }
}

#[async_trait]
impl DocumentApi for HttpDocumentApi {
    async fn check_status(&self, document: &DocumentId, task_id: &TaskId) -> Result<TaskStatus> {
        let url = self.endpoint(&[
            "documents",
            document.as_str(),
            "tasks",
            task_id.as_str(),
            "status",
        ])?;

        let response = self.send(self.client.get(url)).await?;
        let body: StatusResponse = response.json().await?;
        Ok(body.status)
    }

    async fn fetch_artifact(
        &self,
        document: &DocumentId,
        filename: &str,
        task_id: Option<&TaskId>,
    ) -> Result<Vec<u8>> {
        let url = self.endpoint(&["documents", document.as_str(), "download"])?;

        let mut query = vec![("filename", filename)];
        if let Some(task_id) = task_id {
            query.push(("task_id", task_id.as_str()));
        }

        let response = self.send(self.client.get(url).query(&query)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn publish(&self, document: &DocumentId, destination: Destination) -> Result<()> {
        let url = self.endpoint(&[
            "documents",
            document.as_str(),
            "publish",
            destination.path_segment(),
        ])?;

        self.send(self.client.post(url)).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
