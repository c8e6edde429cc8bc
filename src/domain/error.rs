use thiserror::Error;

/// Where a transport failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStage {
    /// Request rejected or answered with a non-2xx status
    Connect,
    /// Body stream broke off or ended without a terminal status
    Stream,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Transport error ({stage:?}): {reason}")]
    Transport {
        stage: TransportStage,
        reason: String,
    },

    #[error("Malformed status line: {0}")]
    Protocol(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl AppError {
    pub fn connect(reason: impl ToString) -> Self {
        AppError::Transport {
            stage: TransportStage::Connect,
            reason: reason.to_string(),
        }
    }

    pub fn stream(reason: impl ToString) -> Self {
        AppError::Transport {
            stage: TransportStage::Stream,
            reason: reason.to_string(),
        }
    }
}
