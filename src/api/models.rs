use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://your-render-app.onrender.com";

/// Body of `POST /download`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadRequest {
    pub url: String,
    pub quality: String,
}

/// Body of `POST /download-thumbnail`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThumbnailRequest {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendRequest {
    Download(DownloadRequest),
    Thumbnail(ThumbnailRequest),
}

impl BackendRequest {
    pub fn endpoint(&self) -> &'static str {
        match self {
            BackendRequest::Download(_) => "/download",
            BackendRequest::Thumbnail(_) => "/download-thumbnail",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Started,
    Progress,
    Completed,
    Error,
    #[serde(other)]
    Unknown,
}

/// One line of the NDJSON status stream
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProgressUpdate {
    pub status: ProgressStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub percent: Option<f64>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(rename = "downloadUrl", default)]
    pub download_url: Option<String>,
}

impl ProgressUpdate {
    /// Message text, treating an empty string as absent.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.trim().is_empty())
    }
}

/// Configuration for the API client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Absolute location of an artifact announced by a `completed` update.
    /// Relative paths are appended to the base URL; absolute URLs pass through.
    pub fn artifact_url(&self, download_url: &str) -> String {
        match Url::parse(download_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => url.to_string(),
            _ => format!("{}{}", self.base_url, download_url),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_wire_names() {
        let update: ProgressUpdate = serde_json::from_str(
            r#"{"status":"completed","filename":"video.mp4","downloadUrl":"/files/video.mp4"}"#,
        )
        .unwrap();
        assert_eq!(update.status, ProgressStatus::Completed);
        assert_eq!(update.filename.as_deref(), Some("video.mp4"));
        assert_eq!(update.download_url.as_deref(), Some("/files/video.mp4"));
        assert_eq!(update.percent, None);
    }

    #[test]
    fn test_unknown_status() {
        let update: ProgressUpdate = serde_json::from_str(r#"{"status":"queued"}"#).unwrap();
        assert_eq!(update.status, ProgressStatus::Unknown);
    }

    #[test]
    fn test_empty_message_is_absent() {
        let update: ProgressUpdate =
            serde_json::from_str(r#"{"status":"progress","message":"  "}"#).unwrap();
        assert_eq!(update.message(), None);
    }

    #[test]
    fn test_request_body() {
        let body = serde_json::to_value(DownloadRequest {
            url: "https://youtu.be/abc123".to_string(),
            quality: "720p".to_string(),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"url": "https://youtu.be/abc123", "quality": "720p"})
        );
    }

    #[test]
    fn test_artifact_url() {
        let config = ApiConfig::new("https://backend.example/");
        assert_eq!(
            config.artifact_url("/files/video.mp4"),
            "https://backend.example/files/video.mp4"
        );
        assert_eq!(
            config.artifact_url("https://cdn.example/v.mp4"),
            "https://cdn.example/v.mp4"
        );
    }

    #[test]
    fn test_base_url_trimmed() {
        assert_eq!(
            ApiConfig::new("http://localhost:8000//").base_url,
            "http://localhost:8000"
        );
    }
}
