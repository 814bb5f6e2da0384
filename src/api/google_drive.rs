//! Implements the `Drive` trait with the Google Drive v3 REST API.

use crate::api::{Drive, TokenProvider};
use crate::error::Res;
use anyhow::{bail, Context};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::trace;

const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";

/// Implements the `Drive` trait against Google Drive. It takes a `TokenProvider`, which it asks for
/// a fresh access token before every request.
#[derive(Debug)]
pub(super) struct GoogleDrive {
    token_provider: TokenProvider,
    client: reqwest::Client,
}

/// The subset of Drive file metadata that we request.
#[derive(Debug, Deserialize)]
struct FileMetadata {
    /// Drive sends the version as a string-encoded int64.
    version: Option<String>,
}

impl GoogleDrive {
    pub(super) fn new(token_provider: TokenProvider) -> Self {
        Self {
            token_provider,
            client: reqwest::Client::new(),
        }
    }

    /// Attaches a valid access token to `request` and sends it.
    async fn send(&mut self, request: RequestBuilder, what: &str) -> Res<Response> {
        let token = self.token_provider.token_with_refresh().await?.to_string();
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("Failed to send the {what} request to Google Drive"))?;
        check_status(response, what).await
    }
}

#[async_trait::async_trait]
impl Drive for GoogleDrive {
    async fn download(&mut self, file_id: &str) -> Res<Vec<u8>> {
        trace!("download {file_id}");
        let request = self
            .client
            .get(format!("{FILES_URL}/{file_id}"))
            .query(&[("alt", "media")]);
        let bytes = self
            .send(request, "download")
            .await?
            .bytes()
            .await
            .context("Failed to read the document downloaded from Google Drive")?;
        Ok(bytes.to_vec())
    }

    async fn version(&mut self, file_id: &str) -> Res<Option<String>> {
        trace!("version {file_id}");
        let request = self
            .client
            .get(format!("{FILES_URL}/{file_id}"))
            .query(&[("fields", "version")]);
        let metadata: FileMetadata = self
            .send(request, "metadata")
            .await?
            .json()
            .await
            .context("Failed to parse the Google Drive file metadata")?;
        Ok(metadata.version)
    }

    async fn replace(&mut self, file_id: &str, bytes: &[u8]) -> Res<Option<String>> {
        trace!("replace {file_id} with {} bytes", bytes.len());
        let request = self
            .client
            .patch(format!("{UPLOAD_URL}/{file_id}"))
            .query(&[("uploadType", "media"), ("fields", "version")])
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(bytes.to_vec());
        let metadata: FileMetadata = self
            .send(request, "upload")
            .await?
            .json()
            .await
            .context("Failed to parse the Google Drive upload response")?;
        Ok(metadata.version)
    }
}

/// Turns a non-success response into an error that includes the status and the response body.
async fn check_status(response: Response, what: &str) -> Res<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read response body".to_string());
    if status == StatusCode::NOT_FOUND {
        bail!("File not found in Google Drive ({what} returned {status}): {body}");
    }
    bail!("Google Drive {what} failed with status {status}: {body}")
}
