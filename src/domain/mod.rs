pub mod error;
pub mod model;

pub use error::{AppError, TransportStage};
pub use model::{
    ButtonKind, ButtonState, DownloadLink, FormState, InputIndicator, Panel, Quality,
    SubmissionKind,
};
