//! Session error types.

use thiserror::Error;

/// Errors raised while collecting answers.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The human stopped answering; recorded answers are kept.
    #[error("Session interrupted")]
    Interrupted,

    /// A step needs an answer that non-interactive mode cannot supply.
    #[error("No answer available for step '{step}'")]
    MissingInput { step: String },

    /// Saved state does not belong to this workflow or is unreadable.
    #[error("Invalid session state: {0}")]
    State(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Check if the session can be resumed after this error.
    pub fn is_resumable(&self) -> bool {
        matches!(self, Self::Interrupted | Self::MissingInput { .. })
    }
}
