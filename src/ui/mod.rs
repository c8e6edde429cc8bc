use iced::{
    widget::{button, column, container, pick_list, progress_bar, row, text, text_input, Space},
    Color, Element, Length,
};

use crate::application::FormView;
use crate::domain::{ButtonKind, ButtonState, DownloadLink, InputIndicator, Panel, Quality};

pub const URL_INPUT_ID: &str = "video-url";

/// Main view state, written only through [`FormView`]
pub struct DownloadView {
    pub url: String,
    pub indicator: InputIndicator,
    pub quality: Quality,
    pub progress_visible: bool,
    pub progress_text: String,
    pub progress_percent: f64,
    pub success_visible: bool,
    pub success_text: String,
    pub download_link: Option<DownloadLink>,
    pub save_status: Option<String>,
    pub error_visible: bool,
    pub error_message: String,
    pub download_button: ButtonState,
    pub thumbnail_button: ButtonState,
    focus_requested: bool,
}

impl Default for DownloadView {
    fn default() -> Self {
        Self {
            url: String::new(),
            indicator: InputIndicator::Neutral,
            quality: Quality::default(),
            progress_visible: false,
            progress_text: String::new(),
            progress_percent: 0.0,
            success_visible: false,
            success_text: String::new(),
            download_link: None,
            save_status: None,
            error_visible: false,
            error_message: String::new(),
            download_button: ButtonState::Idle,
            thumbnail_button: ButtonState::Idle,
            focus_requested: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DownloadMessage {
    UrlChanged(String),
    QualitySelected(Quality),
    DownloadPressed,
    ThumbnailPressed,
    SavePressed,
    RetryPressed,
}

impl FormView for DownloadView {
    fn set_input_text(&mut self, text: &str) {
        self.url = text.to_string();
    }

    fn set_input_indicator(&mut self, indicator: InputIndicator) {
        self.indicator = indicator;
    }

    fn focus_input(&mut self) {
        self.focus_requested = true;
    }

    fn set_selected_quality(&mut self, quality: Quality) {
        self.quality = quality;
    }

    fn set_panel_visible(&mut self, panel: Panel, visible: bool) {
        match panel {
            Panel::Progress => self.progress_visible = visible,
            Panel::Success => self.success_visible = visible,
            Panel::Error => self.error_visible = visible,
        }
    }

    fn set_progress(&mut self, text: &str, percent: f64) {
        self.progress_text = text.to_string();
        self.progress_percent = percent;
    }

    fn set_success(&mut self, text: &str, link: Option<&DownloadLink>) {
        self.success_text = text.to_string();
        self.download_link = link.cloned();
    }

    fn set_save_status(&mut self, status: Option<&str>) {
        self.save_status = status.map(str::to_string);
    }

    fn set_error_message(&mut self, message: &str) {
        self.error_message = message.to_string();
    }

    fn set_button(&mut self, kind: ButtonKind, state: ButtonState) {
        match kind {
            ButtonKind::Download => self.download_button = state,
            ButtonKind::Thumbnail => self.thumbnail_button = state,
        }
    }
}

fn rgb(bytes: [u8; 3]) -> Color {
    Color::from_rgb8(bytes[0], bytes[1], bytes[2])
}

fn form_button(
    kind: ButtonKind,
    state: ButtonState,
    message: DownloadMessage,
) -> iced::widget::Button<'static, DownloadMessage> {
    button(text(state.label(kind)))
        .on_press_maybe(state.is_enabled().then_some(message))
        .padding([10, 20])
}

impl DownloadView {
    /// Returns whether a focus request is pending, clearing it.
    pub fn take_focus_request(&mut self) -> bool {
        std::mem::take(&mut self.focus_requested)
    }

    pub fn view(&self) -> Element<'_, DownloadMessage> {
        let border_color = rgb(self.indicator.rgb());
        let input = text_input("Paste a YouTube URL...", &self.url)
            .id(URL_INPUT_ID)
            .on_input(DownloadMessage::UrlChanged)
            .on_submit(DownloadMessage::DownloadPressed)
            .padding(10)
            .style(move |theme, status| {
                let mut style = text_input::default(theme, status);
                style.border.color = border_color;
                style
            });

        let controls = row![
            pick_list(Quality::ALL, Some(self.quality), DownloadMessage::QualitySelected)
                .padding(10),
            form_button(
                ButtonKind::Download,
                self.download_button,
                DownloadMessage::DownloadPressed
            ),
            form_button(
                ButtonKind::Thumbnail,
                self.thumbnail_button,
                DownloadMessage::ThumbnailPressed
            ),
        ]
        .spacing(10);

        let mut content = column![
            text("Video Downloader").size(32),
            Space::new().height(Length::Fixed(20.0)),
            text("Video URL:").size(16),
            input,
            controls,
            Space::new().height(Length::Fixed(10.0)),
        ]
        .padding(20)
        .spacing(10);

        if self.progress_visible {
            content = content.push(self.progress_panel());
        }
        if self.success_visible {
            content = content.push(self.success_panel());
        }
        if self.error_visible {
            content = content.push(self.error_panel());
        }

        content.into()
    }

    fn progress_panel(&self) -> Element<'_, DownloadMessage> {
        container(
            column![
                row![
                    text(&self.progress_text).size(14).width(Length::Fill),
                    text(format!("{}%", self.progress_percent.round())).size(14),
                ],
                progress_bar(0.0..=100.0, self.progress_percent as f32),
            ]
            .spacing(6),
        )
        .padding(10)
        .into()
    }

    fn success_panel(&self) -> Element<'_, DownloadMessage> {
        let mut panel = column![text(&self.success_text).size(16)].spacing(8);

        if let Some(link) = &self.download_link {
            panel = panel.push(text(&link.url).size(12));
            panel = panel.push(
                button("Save file")
                    .on_press(DownloadMessage::SavePressed)
                    .padding([6, 14]),
            );
        }
        if let Some(status) = &self.save_status {
            panel = panel.push(text(status).size(14));
        }
        panel = panel.push(
            button("Download another")
                .on_press(DownloadMessage::RetryPressed)
                .padding([6, 14]),
        );

        container(panel).padding(10).into()
    }

    fn error_panel(&self) -> Element<'_, DownloadMessage> {
        container(
            column![
                text(&self.error_message).size(14).color(rgb(InputIndicator::Invalid.rgb())),
                button("Try Again")
                    .on_press(DownloadMessage::RetryPressed)
                    .padding([6, 14]),
            ]
            .spacing(8),
        )
        .padding(10)
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_visibility_mirrors_calls() {
        let mut view = DownloadView::default();
        view.set_panel_visible(Panel::Error, true);
        view.set_error_message("Download failed");
        assert!(view.error_visible);
        assert!(!view.progress_visible && !view.success_visible);
        assert_eq!(view.error_message, "Download failed");
    }

    #[test]
    fn test_focus_request_is_consumed() {
        let mut view = DownloadView::default();
        assert!(!view.take_focus_request());
        view.focus_input();
        assert!(view.take_focus_request());
        assert!(!view.take_focus_request());
    }
}
