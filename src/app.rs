use crate::api::{ApiClient, ApiConfig};
use crate::application::{
    ControllerTimings, DownloadCoordinator, Effect, FormController, SaveEvent, SubmissionEvent,
    SubmissionId, Timer,
};
use crate::domain::DownloadLink;
use crate::ui::{DownloadMessage, DownloadView, URL_INPUT_ID};
use futures::StreamExt;
use iced::task::Handle;
use iced::Task;
use std::collections::HashMap;
use std::path::PathBuf;

/// Identifies a running task so its abort handle can be released once it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKey {
    Submission(SubmissionId),
    Timer(u64),
    Save(u64),
}

pub struct DownloadApp {
    controller: FormController<DownloadView>,
    coordinator: DownloadCoordinator,
    // Streams, timers and saves still running; dropping a handle aborts its task
    pending: HashMap<TaskKey, Handle>,
    next_task: u64,
}

impl Default for DownloadApp {
    fn default() -> Self {
        Self::new(ApiConfig::default())
    }
}

impl DownloadApp {
    pub fn new(config: ApiConfig) -> Self {
        let coordinator = DownloadCoordinator::new(ApiClient::new(config.clone()));
        let controller =
            FormController::new(DownloadView::default(), config, ControllerTimings::default());

        Self {
            controller,
            coordinator,
            pending: HashMap::new(),
            next_task: 0,
        }
    }

    fn next_task_id(&mut self) -> u64 {
        self.next_task += 1;
        self.next_task
    }

    fn track(&mut self, key: TaskKey, task: Task<Message>) -> Task<Message> {
        let (task, handle) = task.abortable();
        self.pending.insert(key, handle.abort_on_drop());
        task
    }

    /// Forget a task that has delivered its last message.
    fn release(&mut self, key: TaskKey) {
        self.pending.remove(&key);
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(DownloadMessage),
    Submission(SubmissionId, SubmissionEvent),
    /// (Task, Timer)
    TimerFired(u64, Timer),
    /// (Task, Generation, Selected Path, Artifact)
    SavePathSelected(u64, u64, Option<PathBuf>, DownloadLink),
    /// (Task, Generation, Event)
    Save(u64, u64, SaveEvent),
}

pub fn update(app: &mut DownloadApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => match ui_msg {
            DownloadMessage::UrlChanged(value) => {
                app.controller.on_input_changed(value);
            }
            DownloadMessage::QualitySelected(quality) => {
                app.controller.select_quality(quality);
            }
            DownloadMessage::DownloadPressed => {
                let effect = app.controller.submit_download();
                return run_effects(app, effect);
            }
            DownloadMessage::ThumbnailPressed => {
                let effect = app.controller.submit_thumbnail();
                return run_effects(app, effect);
            }
            DownloadMessage::SavePressed => {
                let effect = app.controller.request_save();
                return run_effects(app, effect);
            }
            DownloadMessage::RetryPressed => {
                let effects = app.controller.reset();
                let task = run_effects(app, effects);
                if app.controller.view_mut().take_focus_request() {
                    return Task::batch([task, iced::widget::operation::focus(URL_INPUT_ID)]);
                }
                return task;
            }
        },
        Message::Submission(id, event) => {
            if matches!(event, SubmissionEvent::Closed | SubmissionEvent::Failed(_)) {
                app.release(TaskKey::Submission(id));
            }
            let effects = app.controller.handle_stream_event(id, event);
            return run_effects(app, effects);
        }
        Message::TimerFired(task, timer) => {
            app.release(TaskKey::Timer(task));
            let effects = app.controller.handle_timer(timer);
            return run_effects(app, effects);
        }
        Message::SavePathSelected(task, generation, path_opt, link) => match path_opt {
            Some(path) => {
                log::info!("Saving {} to {}", link.url, path.display());
                let stream = app
                    .coordinator
                    .save_stream(link.url, path)
                    .map(move |event| Message::Save(task, generation, event));
                // The save stream takes over the dialog's key.
                return app.track(TaskKey::Save(task), Task::stream(stream));
            }
            None => {
                // User cancelled dialog
                app.release(TaskKey::Save(task));
                app.controller
                    .handle_save_event(generation, SaveEvent::Cancelled);
            }
        },
        Message::Save(task, generation, event) => {
            if matches!(event, SaveEvent::Completed(_) | SaveEvent::Failed(_)) {
                app.release(TaskKey::Save(task));
            }
            app.controller.handle_save_event(generation, event);
        }
    }
    Task::none()
}

fn run_effects(app: &mut DownloadApp, effects: impl IntoIterator<Item = Effect>) -> Task<Message> {
    let tasks: Vec<Task<Message>> = effects
        .into_iter()
        .map(|effect| run_effect(app, effect))
        .collect();
    Task::batch(tasks)
}

fn run_effect(app: &mut DownloadApp, effect: Effect) -> Task<Message> {
    match effect {
        Effect::Send {
            submission,
            request,
        } => {
            let stream = app
                .coordinator
                .status_stream(request)
                .map(move |event| Message::Submission(submission, event));
            app.track(TaskKey::Submission(submission), Task::stream(stream))
        }
        Effect::Schedule { delay, timer } => {
            let task = app.next_task_id();
            app.track(
                TaskKey::Timer(task),
                Task::perform(async move { tokio::time::sleep(delay).await }, move |_| {
                    Message::TimerFired(task, timer)
                }),
            )
        }
        Effect::SaveArtifact { generation, link } => {
            let task = app.next_task_id();
            let coordinator = app.coordinator.clone();
            let suggested = link.filename.clone();
            // Step 1: Open Save Dialog; the transfer starts once a path is chosen
            app.track(
                TaskKey::Save(task),
                Task::perform(
                    async move { coordinator.choose_save_path(suggested).await },
                    move |path| Message::SavePathSelected(task, generation, path, link),
                ),
            )
        }
        Effect::CancelPending => {
            app.pending.clear();
            Task::none()
        }
    }
}

pub fn view(app: &DownloadApp) -> iced::Element<'_, Message> {
    app.controller.view().view().map(Message::UiMessage)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started_app() -> DownloadApp {
        let mut app = DownloadApp::new(ApiConfig::new("http://127.0.0.1:9"));
        let _ = update(
            &mut app,
            Message::UiMessage(DownloadMessage::UrlChanged(
                "https://youtu.be/abc123".to_string(),
            )),
        );
        let _ = update(&mut app, Message::UiMessage(DownloadMessage::DownloadPressed));
        app
    }

    #[tokio::test]
    async fn test_finished_submission_releases_handle() {
        let mut app = started_app();
        assert_eq!(app.pending.len(), 1);
        assert!(app.pending.contains_key(&TaskKey::Submission(1)));

        let _ = update(&mut app, Message::Submission(1, SubmissionEvent::Closed));
        assert!(app.pending.is_empty());
    }

    #[tokio::test]
    async fn test_fired_timer_releases_handle() {
        let mut app = started_app();
        let completed = serde_json::from_str(
            r#"{"status":"completed","filename":"video.mp4"}"#,
        )
        .unwrap();
        let _ = update(
            &mut app,
            Message::Submission(1, SubmissionEvent::Update(completed)),
        );
        let _ = update(&mut app, Message::Submission(1, SubmissionEvent::Closed));

        let keys: Vec<TaskKey> = app.pending.keys().copied().collect();
        let [TaskKey::Timer(task)] = keys.as_slice() else {
            panic!("expected one reveal timer, got {:?}", keys);
        };
        let timer = Timer::RevealSuccess {
            generation: 0,
            submission: 1,
            kind: crate::domain::SubmissionKind::Video {
                quality: crate::domain::Quality::Best,
            },
            filename: "video.mp4".to_string(),
            link: None,
        };
        let _ = update(&mut app, Message::TimerFired(*task, timer));
        assert!(app.pending.is_empty());
        assert!(app.controller.view().success_visible);
    }

    #[tokio::test]
    async fn test_reset_drops_every_handle() {
        let mut app = started_app();
        let _ = update(&mut app, Message::UiMessage(DownloadMessage::RetryPressed));
        assert!(app.pending.is_empty());
        assert!(app.controller.view().url.is_empty());
    }
}
