//! The download form's controller.
//!
//! The controller owns the [`FormState`] and pushes every change through an
//! injected [`FormView`]. It never performs I/O itself: work that needs the
//! network, a timer or a file dialog is returned as an [`Effect`] for the
//! caller to run, and the results come back through the `handle_*` methods.

use std::time::Duration;

use crate::{
    api::{
        ApiConfig, BackendRequest, DownloadRequest, ProgressStatus, ProgressUpdate,
        ThumbnailRequest,
    },
    application::download_coordinator::{SaveEvent, SubmissionEvent},
    domain::{
        AppError, ButtonKind, ButtonState, DownloadLink, FormState, InputIndicator, Panel, Quality,
        SubmissionKind, TransportStage,
    },
    utils::{extract_video_id, is_supported_url},
};

const INVALID_URL_TEXT: &str = "Please enter a valid YouTube URL";
const PREPARING_TEXT: &str = "Preparing download...";

/// Rendering surface bound to the controller.
pub trait FormView {
    fn set_input_text(&mut self, text: &str);
    fn set_input_indicator(&mut self, indicator: InputIndicator);
    fn focus_input(&mut self);
    fn set_selected_quality(&mut self, quality: Quality);
    fn set_panel_visible(&mut self, panel: Panel, visible: bool);
    fn set_progress(&mut self, text: &str, percent: f64);
    /// `link` is `None` when the backend did not announce a download URL.
    fn set_success(&mut self, text: &str, link: Option<&DownloadLink>);
    fn set_save_status(&mut self, status: Option<&str>);
    fn set_error_message(&mut self, message: &str);
    fn set_button(&mut self, kind: ButtonKind, state: ButtonState);
}

pub type SubmissionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerTimings {
    /// From `completed` to the success reveal
    pub reveal_delay: Duration,
    /// From the success reveal to the save action
    pub save_delay: Duration,
}

impl Default for ControllerTimings {
    fn default() -> Self {
        Self {
            reveal_delay: Duration::from_millis(500),
            save_delay: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Timer {
    RevealSuccess {
        generation: u64,
        submission: SubmissionId,
        kind: SubmissionKind,
        filename: String,
        link: Option<DownloadLink>,
    },
    TriggerSave {
        generation: u64,
        link: DownloadLink,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Send {
        submission: SubmissionId,
        request: BackendRequest,
    },
    Schedule {
        delay: Duration,
        timer: Timer,
    },
    SaveArtifact {
        generation: u64,
        link: DownloadLink,
    },
    /// Abort every outstanding stream, timer and save.
    CancelPending,
}

#[derive(Debug, Clone)]
struct Submission {
    id: SubmissionId,
    kind: SubmissionKind,
    url: String,
    /// A completed or error outcome has already been presented
    terminal: bool,
}

pub struct FormController<V: FormView> {
    view: V,
    config: ApiConfig,
    timings: ControllerTimings,
    state: FormState,
    generation: u64,
    next_id: SubmissionId,
    submissions: Vec<Submission>,
    last_link: Option<DownloadLink>,
}

impl<V: FormView> FormController<V> {
    pub fn new(view: V, config: ApiConfig, timings: ControllerTimings) -> Self {
        let mut controller = Self {
            view,
            config,
            timings,
            state: FormState::default(),
            generation: 0,
            next_id: 1,
            submissions: Vec::new(),
            last_link: None,
        };
        controller.hide_all_panels();
        controller.set_button(ButtonKind::Download, ButtonState::Idle);
        controller.set_button(ButtonKind::Thumbnail, ButtonState::Idle);
        controller
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    #[cfg(test)]
    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn on_input_changed(&mut self, value: String) -> bool {
        self.view.set_input_text(&value);
        self.state.url = value;
        self.validate_url()
    }

    pub fn select_quality(&mut self, quality: Quality) {
        self.state.quality = quality;
        self.view.set_selected_quality(quality);
    }

    /// Valid when empty or when it names a supported host. Updates the border.
    pub fn validate_url(&mut self) -> bool {
        let url = self.state.url.trim();
        let empty = url.is_empty();
        let valid = is_supported_url(url);

        let indicator = if !empty && !valid {
            InputIndicator::Invalid
        } else {
            InputIndicator::Neutral
        };
        self.state.indicator = indicator;
        self.view.set_input_indicator(indicator);

        valid || empty
    }

    pub fn submit_download(&mut self) -> Option<Effect> {
        let quality = self.state.quality;
        self.submit(SubmissionKind::Video { quality })
    }

    pub fn submit_thumbnail(&mut self) -> Option<Effect> {
        self.submit(SubmissionKind::Thumbnail)
    }

    fn submit(&mut self, kind: SubmissionKind) -> Option<Effect> {
        let button = kind.button();
        if !self.state.button(button).is_enabled() {
            log::debug!("{:?} button busy, ignoring submission", button);
            return None;
        }

        let url = self.state.url.trim().to_string();
        if url.is_empty() {
            self.reveal_error(&AppError::Validation(kind.empty_url_text().to_string()));
            return None;
        }
        if !self.validate_url() {
            self.reveal_error(&AppError::Validation(INVALID_URL_TEXT.to_string()));
            return None;
        }

        self.hide_all_panels();
        self.show_progress(PREPARING_TEXT, 0.0);
        self.set_button(button, ButtonState::Loading);

        let id = self.next_id;
        self.next_id += 1;

        let request = match &kind {
            SubmissionKind::Video { quality } => BackendRequest::Download(DownloadRequest {
                url: url.clone(),
                quality: quality.value().to_string(),
            }),
            SubmissionKind::Thumbnail => {
                BackendRequest::Thumbnail(ThumbnailRequest { url: url.clone() })
            }
        };

        log::info!("Submission {} ({:?}) for {}", id, kind, url);
        self.submissions.push(Submission {
            id,
            kind,
            url,
            terminal: false,
        });

        Some(Effect::Send {
            submission: id,
            request,
        })
    }

    /// Apply one event from a submission's status stream.
    pub fn handle_stream_event(&mut self, id: SubmissionId, event: SubmissionEvent) -> Vec<Effect> {
        let Some(index) = self.submissions.iter().position(|s| s.id == id) else {
            log::debug!("Dropping event for abandoned submission {}", id);
            return Vec::new();
        };

        match event {
            SubmissionEvent::Update(update) => self.apply_update(index, update),
            SubmissionEvent::Failed(error) => {
                self.fail(index, &error);
                self.finish(index);
                Vec::new()
            }
            SubmissionEvent::Closed => {
                self.finish(index);
                Vec::new()
            }
        }
    }

    fn apply_update(&mut self, index: usize, update: ProgressUpdate) -> Vec<Effect> {
        if self.submissions[index].terminal {
            log::debug!("Ignoring {:?} after terminal status", update.status);
            return Vec::new();
        }

        let kind = self.submissions[index].kind.clone();
        log::debug!("Submission {}: {:?}", self.submissions[index].id, update);

        match update.status {
            ProgressStatus::Started => {
                self.show_progress(&kind.started_text(), 10.0);
                Vec::new()
            }
            ProgressStatus::Progress => {
                let text = update.message().unwrap_or(kind.progress_text()).to_string();
                let percent = update.percent.unwrap_or(50.0).clamp(0.0, 100.0);
                self.show_progress(&text, percent);
                Vec::new()
            }
            ProgressStatus::Completed => {
                self.submissions[index].terminal = true;
                self.update_progress(kind.completed_text(), 100.0);

                let filename = update
                    .filename
                    .clone()
                    .filter(|f| !f.trim().is_empty())
                    .or_else(|| extract_video_id(&self.submissions[index].url))
                    .unwrap_or_else(|| "download".to_string());
                let link = update.download_url.as_deref().map(|path| DownloadLink {
                    filename: filename.clone(),
                    url: self.config.artifact_url(path),
                });
                log::info!("Submission {} completed: {}", self.submissions[index].id, filename);

                vec![Effect::Schedule {
                    delay: self.timings.reveal_delay,
                    timer: Timer::RevealSuccess {
                        generation: self.generation,
                        submission: self.submissions[index].id,
                        kind,
                        filename,
                        link,
                    },
                }]
            }
            ProgressStatus::Error => {
                let message = update.message().unwrap_or(kind.failed_text()).to_string();
                self.fail(index, &AppError::Backend(message));
                Vec::new()
            }
            ProgressStatus::Unknown => {
                log::warn!("Ignoring update with unknown status: {:?}", update);
                Vec::new()
            }
        }
    }

    /// Reveal the first failure of a submission and release its button.
    fn fail(&mut self, index: usize, error: &AppError) {
        let button = self.submissions[index].kind.button();
        if !self.submissions[index].terminal {
            self.submissions[index].terminal = true;
            log::error!("Submission {} failed: {}", self.submissions[index].id, error);
            let message = self.user_message(index, error);
            self.reveal_error(&AppError::Backend(message));
        }
        self.set_button(button, ButtonState::Idle);
    }

    fn finish(&mut self, index: usize) {
        let submission = self.submissions.remove(index);
        self.set_button(submission.kind.button(), ButtonState::Idle);
    }

    fn user_message(&self, index: usize, error: &AppError) -> String {
        let kind = &self.submissions[index].kind;
        match error {
            AppError::Transport {
                stage: TransportStage::Connect,
                ..
            } => kind.connect_failed_text().to_string(),
            AppError::Transport {
                stage: TransportStage::Stream,
                ..
            } => kind.connection_lost_text().to_string(),
            AppError::Backend(message) | AppError::Validation(message) => message.clone(),
            AppError::Protocol(_) | AppError::Io(_) => kind.failed_text().to_string(),
        }
    }

    pub fn handle_timer(&mut self, timer: Timer) -> Vec<Effect> {
        match timer {
            Timer::RevealSuccess {
                generation,
                submission,
                kind,
                filename,
                link,
            } => {
                if generation != self.generation {
                    return Vec::new();
                }
                if self.next_id > submission + 1 {
                    log::info!(
                        "Submission {} superseded, not revealing {}",
                        submission,
                        filename
                    );
                    return Vec::new();
                }
                self.hide_all_panels();
                self.show_panel(Panel::Success);
                let text = format!("Downloaded: {} ({})", filename, kind.success_label());
                self.view.set_success(&text, link.as_ref());
                self.view.set_save_status(None);
                self.last_link = link.clone();

                link.map(|link| Effect::Schedule {
                    delay: self.timings.save_delay,
                    timer: Timer::TriggerSave { generation, link },
                })
                .into_iter()
                .collect()
            }
            Timer::TriggerSave { generation, link } => {
                if generation != self.generation {
                    return Vec::new();
                }
                vec![Effect::SaveArtifact { generation, link }]
            }
        }
    }

    /// Manual save of the artifact shown in the success panel.
    pub fn request_save(&self) -> Option<Effect> {
        if self.state.panel != Some(Panel::Success) {
            return None;
        }
        self.last_link.clone().map(|link| Effect::SaveArtifact {
            generation: self.generation,
            link,
        })
    }

    pub fn handle_save_event(&mut self, generation: u64, event: SaveEvent) {
        if generation != self.generation {
            return;
        }
        let status = match event {
            SaveEvent::Progress(progress) => format!("Saving... {:.0}%", progress * 100.0),
            SaveEvent::Completed(path) => format!("Saved to {}", path.display()),
            SaveEvent::Cancelled => "Save cancelled".to_string(),
            SaveEvent::Failed(e) => {
                log::error!("Saving artifact failed: {}", e);
                format!("Save failed: {}", e)
            }
        };
        self.view.set_save_status(Some(&status));
    }

    /// Back to the initial state; abandons in-flight work.
    pub fn reset(&mut self) -> Vec<Effect> {
        self.generation += 1;
        self.submissions.clear();
        self.last_link = None;

        self.hide_all_panels();
        self.state.url.clear();
        self.view.set_input_text("");
        self.state.indicator = InputIndicator::Neutral;
        self.view.set_input_indicator(InputIndicator::Neutral);
        self.set_button(ButtonKind::Download, ButtonState::Idle);
        self.set_button(ButtonKind::Thumbnail, ButtonState::Idle);
        self.view.focus_input();

        vec![Effect::CancelPending]
    }

    fn reveal_error(&mut self, error: &AppError) {
        self.hide_all_panels();
        self.show_panel(Panel::Error);
        let message = match error {
            AppError::Validation(message) | AppError::Backend(message) => message.clone(),
            other => other.to_string(),
        };
        self.view.set_error_message(&message);
    }

    fn show_progress(&mut self, text: &str, percent: f64) {
        self.show_panel(Panel::Progress);
        self.update_progress(text, percent);
    }

    fn update_progress(&mut self, text: &str, percent: f64) {
        self.view.set_progress(text, percent);
    }

    fn show_panel(&mut self, panel: Panel) {
        self.state.panel = Some(panel);
        for candidate in Panel::ALL {
            self.view.set_panel_visible(candidate, candidate == panel);
        }
    }

    fn hide_all_panels(&mut self) {
        self.state.panel = None;
        for panel in Panel::ALL {
            self.view.set_panel_visible(panel, false);
        }
    }

    fn set_button(&mut self, kind: ButtonKind, state: ButtonState) {
        self.state.set_button(kind, state);
        self.view.set_button(kind, state);
    }
}
