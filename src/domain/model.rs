use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    Progress,
    Success,
    Error,
}

impl Panel {
    pub const ALL: [Panel; 3] = [Panel::Progress, Panel::Success, Panel::Error];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonKind {
    Download,
    Thumbnail,
}

impl ButtonKind {
    pub fn idle_label(self) -> &'static str {
        match self {
            ButtonKind::Download => "Download Video",
            ButtonKind::Thumbnail => "Download Thumbnail",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonState {
    #[default]
    Idle,
    Loading,
}

impl ButtonState {
    pub fn is_enabled(self) -> bool {
        self == ButtonState::Idle
    }

    pub fn label(self, kind: ButtonKind) -> &'static str {
        match self {
            ButtonState::Idle => kind.idle_label(),
            ButtonState::Loading => "Downloading...",
        }
    }
}

/// Border of the URL input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputIndicator {
    #[default]
    Neutral,
    Invalid,
}

impl InputIndicator {
    pub fn rgb(self) -> [u8; 3] {
        match self {
            InputIndicator::Neutral => [0xe1, 0xe5, 0xe9],
            InputIndicator::Invalid => [0xff, 0x41, 0x6c],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    #[default]
    Best,
    P1080,
    P720,
    P480,
    P360,
    Audio,
}

impl Quality {
    pub const ALL: [Quality; 6] = [
        Quality::Best,
        Quality::P1080,
        Quality::P720,
        Quality::P480,
        Quality::P360,
        Quality::Audio,
    ];

    /// Value sent to the backend
    pub fn value(self) -> &'static str {
        match self {
            Quality::Best => "best",
            Quality::P1080 => "1080p",
            Quality::P720 => "720p",
            Quality::P480 => "480p",
            Quality::P360 => "360p",
            Quality::Audio => "audio",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Quality::Best => "Best Quality",
            Quality::Audio => "Audio Only",
            other => other.value(),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a submission fetches; decides wording and the success label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionKind {
    Video { quality: Quality },
    Thumbnail,
}

impl SubmissionKind {
    pub fn button(&self) -> ButtonKind {
        match self {
            SubmissionKind::Video { .. } => ButtonKind::Download,
            SubmissionKind::Thumbnail => ButtonKind::Thumbnail,
        }
    }

    pub fn started_text(&self) -> String {
        match self {
            SubmissionKind::Video { quality } => {
                format!("Starting {} download...", quality.label())
            }
            SubmissionKind::Thumbnail => "Starting thumbnail download...".to_string(),
        }
    }

    pub fn progress_text(&self) -> &'static str {
        match self {
            SubmissionKind::Video { .. } => "Downloading...",
            SubmissionKind::Thumbnail => "Downloading thumbnail...",
        }
    }

    pub fn completed_text(&self) -> &'static str {
        match self {
            SubmissionKind::Video { .. } => "Download completed!",
            SubmissionKind::Thumbnail => "Thumbnail download completed!",
        }
    }

    pub fn failed_text(&self) -> &'static str {
        match self {
            SubmissionKind::Video { .. } => "Download failed",
            SubmissionKind::Thumbnail => "Thumbnail download failed",
        }
    }

    pub fn connect_failed_text(&self) -> &'static str {
        match self {
            SubmissionKind::Video { .. } => {
                "Failed to start download. Please check your connection and try again."
            }
            SubmissionKind::Thumbnail => {
                "Failed to start thumbnail download. Please check your connection and try again."
            }
        }
    }

    pub fn connection_lost_text(&self) -> &'static str {
        match self {
            SubmissionKind::Video { .. } => "Connection lost during download. Please try again.",
            SubmissionKind::Thumbnail => {
                "Connection lost during thumbnail download. Please try again."
            }
        }
    }

    pub fn empty_url_text(&self) -> &'static str {
        match self {
            SubmissionKind::Video { .. } => "Please enter a YouTube URL",
            SubmissionKind::Thumbnail => "Please enter a YouTube URL first",
        }
    }

    pub fn success_label(&self) -> &'static str {
        match self {
            SubmissionKind::Video { quality } => quality.label(),
            SubmissionKind::Thumbnail => "Thumbnail",
        }
    }
}

/// A finished artifact that can be saved locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    pub filename: String,
    pub url: String,
}

/// Transient state of the form; lives for the process lifetime.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormState {
    pub url: String,
    pub quality: Quality,
    /// `None` while idle; otherwise the single visible panel
    pub panel: Option<Panel>,
    pub indicator: InputIndicator,
    pub download_button: ButtonState,
    pub thumbnail_button: ButtonState,
}

impl FormState {
    pub fn button(&self, kind: ButtonKind) -> ButtonState {
        match kind {
            ButtonKind::Download => self.download_button,
            ButtonKind::Thumbnail => self.thumbnail_button,
        }
    }

    pub fn set_button(&mut self, kind: ButtonKind, state: ButtonState) {
        match kind {
            ButtonKind::Download => self.download_button = state,
            ButtonKind::Thumbnail => self.thumbnail_button = state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_labels() {
        assert_eq!(Quality::P720.value(), "720p");
        assert_eq!(Quality::P720.label(), "720p");
        assert_eq!(Quality::Best.label(), "Best Quality");
        assert_eq!(Quality::default(), Quality::Best);
    }

    #[test]
    fn test_button_labels() {
        assert_eq!(ButtonState::Idle.label(ButtonKind::Thumbnail), "Download Thumbnail");
        assert_eq!(ButtonState::Loading.label(ButtonKind::Download), "Downloading...");
        assert!(!ButtonState::Loading.is_enabled());
    }
}
