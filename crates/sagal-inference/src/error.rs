use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference request failed: {0}")]
    Transport(String),

    #[error("inference service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("inference response malformed: {0}")]
    Protocol(String),

    #[error("inference request timed out after {0:?}")]
    Timeout(Duration),

    #[error("inference client config error: {0}")]
    Config(String),
}

impl InferenceError {
    /// Failures that may clear up on their own: transport errors, timeouts,
    /// server errors and rate limiting. Other 4xx replies are deterministic.
    pub fn is_transient(&self) -> bool {
        match self {
            InferenceError::Transport(_) | InferenceError::Timeout(_) => true,
            InferenceError::Status { status, .. } => *status >= 500 || *status == 429,
            InferenceError::Protocol(_) | InferenceError::Config(_) => false,
        }
    }
}
