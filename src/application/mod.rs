pub mod download_coordinator;
pub mod form_controller;

pub use download_coordinator::{DownloadCoordinator, SaveEvent, SubmissionEvent};
pub use form_controller::{ControllerTimings, Effect, FormController, FormView, SubmissionId, Timer};
