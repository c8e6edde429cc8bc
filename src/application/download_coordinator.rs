use std::collections::VecDeque;
use std::path::PathBuf;

use futures::{stream::BoxStream, StreamExt};
use tokio::io::AsyncWriteExt;

use crate::{
    api::{ApiClient, BackendRequest, NdjsonDecoder, ProgressStatus, ProgressUpdate},
    domain::AppError,
    utils::sanitize_filename,
};

/// Events of one submission's status stream. `Failed` or `Closed` is always last.
#[derive(Debug, Clone)]
pub enum SubmissionEvent {
    Update(ProgressUpdate),
    Failed(AppError),
    Closed,
}

#[derive(Debug, Clone)]
pub enum SaveEvent {
    Progress(f32),
    Completed(PathBuf),
    Cancelled,
    Failed(AppError),
}

#[derive(Clone)]
pub struct DownloadCoordinator {
    api_client: ApiClient,
}

impl DownloadCoordinator {
    pub fn new(api_client: ApiClient) -> Self {
        Self { api_client }
    }

    /// Submit `request` and turn the NDJSON response into submission events.
    pub fn status_stream(&self, request: BackendRequest) -> BoxStream<'static, SubmissionEvent> {
        futures::stream::unfold(
            StatusRuntimeState::Start {
                client: self.api_client.clone(),
                request,
            },
            |state| async move {
                match state {
                    StatusRuntimeState::Start { client, request } => {
                        log::info!("POST {}", request.endpoint());
                        match client.open_status_stream(&request).await {
                            Ok(stream) => {
                                let mut reading = StatusReader {
                                    stream: stream.boxed(),
                                    decoder: NdjsonDecoder::new(),
                                    pending: VecDeque::new(),
                                    saw_terminal: false,
                                    ended: false,
                                };
                                let event = reading.next_event().await;
                                Some(reading.into_step(event))
                            }
                            Err(e) => {
                                log::error!("{} failed: {}", request.endpoint(), e);
                                Some((
                                    SubmissionEvent::Failed(AppError::connect(e)),
                                    StatusRuntimeState::Finished,
                                ))
                            }
                        }
                    }
                    StatusRuntimeState::Reading(mut reading) => {
                        let event = reading.next_event().await;
                        Some(reading.into_step(event))
                    }
                    StatusRuntimeState::Finished => None,
                }
            },
        )
        .boxed()
    }

    pub async fn choose_save_path(&self, suggested_filename: String) -> Option<PathBuf> {
        rfd::AsyncFileDialog::new()
            .set_file_name(sanitize_filename(&suggested_filename))
            .save_file()
            .await
            .map(|handle| handle.path().to_path_buf())
    }

    /// Stream an artifact to `path`, reporting progress. The file is only
    /// created once the server has answered, and removed again on failure.
    pub fn save_stream(&self, url: String, path: PathBuf) -> BoxStream<'static, SaveEvent> {
        futures::stream::unfold(
            SaveRuntimeState::Start {
                client: self.api_client.clone(),
                url,
                path,
            },
            |state| async move {
                match state {
                    SaveRuntimeState::Start { client, url, path } => {
                        match ArtifactWriter::open(&client, &url, path).await {
                            Ok(writer) => {
                                Some((SaveEvent::Progress(0.0), SaveRuntimeState::Writing(writer)))
                            }
                            Err(e) => {
                                log::error!("Cannot save {}: {}", url, e);
                                Some((SaveEvent::Failed(e), SaveRuntimeState::Finished))
                            }
                        }
                    }
                    SaveRuntimeState::Writing(mut writer) => match writer.advance().await {
                        Ok(Some(progress)) => Some((
                            SaveEvent::Progress(progress),
                            SaveRuntimeState::Writing(writer),
                        )),
                        Ok(None) => {
                            let path = writer.finish();
                            Some((SaveEvent::Completed(path), SaveRuntimeState::Finished))
                        }
                        Err(e) => {
                            writer.discard().await;
                            Some((SaveEvent::Failed(e), SaveRuntimeState::Finished))
                        }
                    },
                    SaveRuntimeState::Finished => None,
                }
            },
        )
        .boxed()
    }
}

enum StatusRuntimeState {
    Start {
        client: ApiClient,
        request: BackendRequest,
    },
    Reading(StatusReader),
    Finished,
}

struct StatusReader {
    stream: BoxStream<'static, crate::api::Result<bytes::Bytes>>,
    decoder: NdjsonDecoder,
    pending: VecDeque<ProgressUpdate>,
    saw_terminal: bool,
    ended: bool,
}

impl StatusReader {
    /// Next event, paired with whether it is the last one.
    async fn next_event(&mut self) -> (SubmissionEvent, bool) {
        loop {
            if let Some(update) = self.pending.pop_front() {
                if matches!(
                    update.status,
                    ProgressStatus::Completed | ProgressStatus::Error
                ) {
                    self.saw_terminal = true;
                }
                return (SubmissionEvent::Update(update), false);
            }

            if self.ended {
                if self.saw_terminal {
                    return (SubmissionEvent::Closed, true);
                }
                log::warn!("Status stream ended without a terminal status");
                return (
                    SubmissionEvent::Failed(AppError::stream(
                        "stream ended before the download finished",
                    )),
                    true,
                );
            }

            match self.stream.next().await {
                Some(Ok(chunk)) => self.pending.extend(self.decoder.push(&chunk)),
                Some(Err(e)) => {
                    log::error!("Status stream broke off: {}", e);
                    return (SubmissionEvent::Failed(AppError::stream(e)), true);
                }
                None => {
                    self.pending.extend(self.decoder.finish());
                    self.ended = true;
                    if self.decoder.skipped() > 0 {
                        log::info!("Skipped {} malformed status lines", self.decoder.skipped());
                    }
                }
            }
        }
    }

    fn into_step(
        self,
        (event, last): (SubmissionEvent, bool),
    ) -> (SubmissionEvent, StatusRuntimeState) {
        if last {
            (event, StatusRuntimeState::Finished)
        } else {
            (event, StatusRuntimeState::Reading(self))
        }
    }
}

enum SaveRuntimeState {
    Start {
        client: ApiClient,
        url: String,
        path: PathBuf,
    },
    Writing(ArtifactWriter),
    Finished,
}

/// Copies an artifact body into its destination file.
struct ArtifactWriter {
    file: tokio::fs::File,
    body: BoxStream<'static, crate::api::Result<bytes::Bytes>>,
    written: u64,
    expected: Option<u64>,
    path: PathBuf,
}

impl ArtifactWriter {
    async fn open(client: &ApiClient, url: &str, path: PathBuf) -> Result<Self, AppError> {
        let (expected, body) = client
            .download_file_stream(url)
            .await
            .map_err(AppError::connect)?;
        let file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| AppError::Io(format!("cannot create {}: {}", path.display(), e)))?;

        Ok(Self {
            file,
            body: body.boxed(),
            written: 0,
            expected,
            path,
        })
    }

    /// Write the next chunk and return the completed fraction, or `None`
    /// once the whole body is flushed to disk.
    async fn advance(&mut self) -> Result<Option<f32>, AppError> {
        let Some(chunk) = self.body.next().await else {
            self.file
                .sync_all()
                .await
                .map_err(|e| AppError::Io(format!("sync {}: {}", self.path.display(), e)))?;
            return Ok(None);
        };

        let chunk = chunk.map_err(AppError::stream)?;
        self.file
            .write_all(&chunk)
            .await
            .map_err(|e| AppError::Io(format!("write {}: {}", self.path.display(), e)))?;
        self.written += chunk.len() as u64;

        Ok(Some(match self.expected {
            Some(expected) if expected > 0 => (self.written as f32 / expected as f32).min(1.0),
            _ => 0.0,
        }))
    }

    fn finish(self) -> PathBuf {
        log::info!("Saved {} bytes to {}", self.written, self.path.display());
        self.path
    }

    /// Drop the partial file.
    async fn discard(self) {
        let Self { file, path, .. } = self;
        drop(file);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            log::warn!("Could not remove partial file {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiConfig, DownloadRequest, ThumbnailRequest};
    use crate::domain::TransportStage;

    fn coordinator(base_url: String) -> DownloadCoordinator {
        DownloadCoordinator::new(ApiClient::new(ApiConfig::new(base_url)))
    }

    fn download_request() -> BackendRequest {
        BackendRequest::Download(DownloadRequest {
            url: "https://youtu.be/abc123".to_string(),
            quality: "720p".to_string(),
        })
    }

    #[tokio::test]
    async fn test_status_stream_skips_malformed_lines() {
        crate::utils::logging::initialize_for_tests();
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/download")
            .with_status(200)
            .with_body(concat!(
                "{\"status\":\"started\"}\n",
                "[download] this is not json\n",
                "{\"status\":\"progress\",\"percent\":42}\n",
                "{\"status\":\"completed\",\"filename\":\"video.mp4\",\"downloadUrl\":\"/files/video.mp4\"}"
            ))
            .create_async()
            .await;

        let events: Vec<_> = coordinator(server.url())
            .status_stream(download_request())
            .collect()
            .await;

        assert_eq!(events.len(), 4);
        assert!(matches!(
            &events[0],
            SubmissionEvent::Update(u) if u.status == ProgressStatus::Started
        ));
        assert!(matches!(
            &events[1],
            SubmissionEvent::Update(u) if u.percent == Some(42.0)
        ));
        assert!(matches!(
            &events[2],
            SubmissionEvent::Update(u) if u.status == ProgressStatus::Completed
        ));
        assert!(matches!(events[3], SubmissionEvent::Closed));
    }

    #[tokio::test]
    async fn test_status_stream_without_terminal_fails() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/download-thumbnail")
            .with_status(200)
            .with_body("{\"status\":\"started\"}\n")
            .create_async()
            .await;

        let request = BackendRequest::Thumbnail(ThumbnailRequest {
            url: "https://youtu.be/abc123".to_string(),
        });
        let events: Vec<_> = coordinator(server.url())
            .status_stream(request)
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[1],
            SubmissionEvent::Failed(AppError::Transport {
                stage: TransportStage::Stream,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_status_stream_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/download")
            .with_status(500)
            .create_async()
            .await;

        let events: Vec<_> = coordinator(server.url())
            .status_stream(download_request())
            .collect()
            .await;

        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            SubmissionEvent::Failed(AppError::Transport {
                stage: TransportStage::Connect,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_status_stream_unreachable_backend() {
        // Nothing listens on port 9 locally.
        let events: Vec<_> = coordinator("http://127.0.0.1:9".to_string())
            .status_stream(download_request())
            .collect()
            .await;

        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            SubmissionEvent::Failed(AppError::Transport {
                stage: TransportStage::Connect,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_save_stream_writes_file() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/files/video.mp4")
            .with_status(200)
            .with_body("fake mp4 bytes")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video.mp4");
        let url = format!("{}/files/video.mp4", server.url());

        let events: Vec<_> = coordinator(server.url())
            .save_stream(url, path.clone())
            .collect()
            .await;

        assert!(matches!(events.first(), Some(SaveEvent::Progress(p)) if *p == 0.0));
        assert!(matches!(events.last(), Some(SaveEvent::Completed(p)) if *p == path));
        assert_eq!(std::fs::read(&path).unwrap(), b"fake mp4 bytes");
    }

    #[tokio::test]
    async fn test_save_stream_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/files/missing.mp4")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.mp4");
        let url = format!("{}/files/missing.mp4", server.url());

        let events: Vec<_> = coordinator(server.url())
            .save_stream(url, path.clone())
            .collect()
            .await;

        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            SaveEvent::Failed(AppError::Transport {
                stage: TransportStage::Connect,
                ..
            })
        ));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_save_stream_unwritable_destination() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/files/video.mp4")
            .with_status(200)
            .with_body("fake mp4 bytes")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("video.mp4");
        let url = format!("{}/files/video.mp4", server.url());

        let events: Vec<_> = coordinator(server.url())
            .save_stream(url, path.clone())
            .collect()
            .await;

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], SaveEvent::Failed(AppError::Io(_))));
        assert!(!path.exists());
    }
}
