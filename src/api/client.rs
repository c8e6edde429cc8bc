use futures::Stream;
use futures::TryStreamExt;
use reqwest::Client;
use thiserror::Error;

use super::models::{ApiConfig, BackendRequest};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Clone)]
pub struct ApiClient {
    config: ApiConfig,
    http: Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    /// POST a submission and hand back the raw NDJSON body stream.
    pub async fn open_status_stream(
        &self,
        request: &BackendRequest,
    ) -> Result<impl Stream<Item = Result<bytes::Bytes>>> {
        let url = format!("{}{}", self.config.base_url, request.endpoint());

        let builder = self.http.post(&url);
        let builder = match request {
            BackendRequest::Download(body) => builder.json(body),
            BackendRequest::Thumbnail(body) => builder.json(body),
        };

        let response = builder
            .send()
            .await?
            .error_for_status()
            .map_err(|e| {
                ApiError::ApiError(format!("{} request failed: {}", request.endpoint(), e))
            })?;

        let stream = response.bytes_stream().map_err(ApiError::RequestError);

        Ok(stream)
    }

    /// Download an artifact with progress
    /// Returns (total_size, stream)
    pub async fn download_file_stream(
        &self,
        download_url: &str,
    ) -> Result<(Option<u64>, impl Stream<Item = Result<bytes::Bytes>>)> {
        let response = self
            .http
            .get(download_url)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| ApiError::ApiError(format!("Download request failed: {}", e)))?;

        let total_size = response.content_length();
        let stream = response.bytes_stream().map_err(ApiError::RequestError);

        Ok((total_size, stream))
    }
}
