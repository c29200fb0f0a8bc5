//! Error types for the NEUDev terminal.

use neudev_types::SessionStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TerminalError {
    #[error("A run is already in progress (status: {0})")]
    RunInProgress(SessionStatus),

    #[error("No run is in progress")]
    NotRunning,

    #[error("Invalid session state: expected {expected}, got {actual}")]
    InvalidSessionState {
        expected: String,
        actual: SessionStatus,
    },

    #[error("Please enter some code before running")]
    EmptyCode,

    #[error("The compiler does not support {0} yet")]
    UnsupportedLanguage(String),

    #[error("Your code does not look like valid {0} code")]
    InvalidCode(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Channel send error")]
    ChannelSendError,
}
