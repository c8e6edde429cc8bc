pub mod client;
pub mod models;
pub mod ndjson;

pub use client::{ApiClient, Result};
pub use models::{
    ApiConfig, BackendRequest, DownloadRequest, ProgressStatus, ProgressUpdate, ThumbnailRequest,
};
pub use ndjson::NdjsonDecoder;
