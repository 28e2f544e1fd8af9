//! Upload a file to the Anthropic Files API.
//!
//! ```rust,no_run
//! use html2md::upload::{upload_file, UploadClient};
//! use std::path::Path;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = UploadClient::from_env()?;
//! let file = upload_file(Path::new("out/example.com.md"), &client).await?;
//! println!("uploaded as {}", file.id);
//! # Ok(())
//! # }
//! ```

use crate::error::UploadError;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const FILES_API_URL: &str = "https://api.anthropic.com/v1/files";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const FILES_API_BETA: &str = "files-api-2025-04-14";
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

const UPLOAD_TIMEOUT_SECS: u64 = 120;

/// Metadata the API returns for an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Authenticated Files API client.
#[derive(Debug, Clone)]
pub struct UploadClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl UploadClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, UploadError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(UPLOAD_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            endpoint: FILES_API_URL.to_string(),
        })
    }

    /// Build a client from `ANTHROPIC_API_KEY`.
    pub fn from_env() -> Result<Self, UploadError> {
        match std::env::var("ANTHROPIC_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Self::new(key.trim()),
            _ => Err(UploadError::MissingApiKey),
        }
    }

    /// Point the client at a different endpoint (e.g. a proxy or a test server).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// MIME type for `path` from its extension, or [`DEFAULT_MIME_TYPE`].
pub fn guess_mime_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string()
}

/// Upload the file at `path` and return the API's metadata for it.
pub async fn upload_file(path: &Path, client: &UploadClient) -> Result<UploadedFile, UploadError> {
    if !path.is_file() {
        return Err(UploadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let bytes = tokio::fs::read(path).await.map_err(|e| UploadError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let mime = guess_mime_type(path);
    debug!("Uploading {} ({} bytes, {})", filename, bytes.len(), mime);

    let part = Part::bytes(bytes).file_name(filename).mime_str(&mime)?;
    let form = Form::new().part("file", part);

    let response = client
        .http
        .post(&client.endpoint)
        .header("x-api-key", &client.api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .header("anthropic-beta", FILES_API_BETA)
        .multipart(form)
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or_else(|_| body.trim().to_string());
        return Err(UploadError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let file: UploadedFile = serde_json::from_str(&body).map_err(|e| UploadError::Api {
        status: status.as_u16(),
        message: format!("unexpected response body: {e}"),
    })?;
    info!("Uploaded {} as {}", path.display(), file.id);
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_common_types() {
        assert_eq!(guess_mime_type(Path::new("a.md")), "text/markdown");
        assert_eq!(guess_mime_type(Path::new("a.pdf")), "application/pdf");
        assert_eq!(guess_mime_type(Path::new("a.txt")), "text/plain");
    }

    #[test]
    fn unknown_extension_uses_default() {
        assert_eq!(guess_mime_type(Path::new("blob.zzzunknown")), DEFAULT_MIME_TYPE);
        assert_eq!(guess_mime_type(Path::new("noext")), DEFAULT_MIME_TYPE);
    }

    #[tokio::test]
    async fn missing_file_is_reported_before_any_request() {
        let client = UploadClient::new("test-key")
            .unwrap()
            .with_endpoint("http://127.0.0.1:9/never-called");
        let err = upload_file(Path::new("/no/such/file.md"), &client)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::FileNotFound { .. }));
        assert_eq!(err.to_string(), "File not found: /no/such/file.md");
    }

    #[test]
    fn uploaded_file_tolerates_extra_fields() {
        let f: UploadedFile = serde_json::from_str(
            r#"{"id":"file_123","type":"file","filename":"a.md","mime_type":"text/markdown","size_bytes":12,"created_at":"x"}"#,
        )
        .unwrap();
        assert_eq!(f.id, "file_123");
        assert_eq!(f.size_bytes, Some(12));
    }
}
