use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid confidence: {0}")]
    InvalidConfidence(String),

    #[error("invalid gender: {0}")]
    InvalidGender(String),
}

/// Rejections raised while accepting a user-selected image.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("not an image: {file_name} has type {mime_type}")]
    NotAnImage { file_name: String, mime_type: String },

    #[error("too large: {file_name} is {size_bytes} bytes, limit is {max_bytes}")]
    TooLarge {
        file_name: String,
        size_bytes: u64,
        max_bytes: u64,
    },

    #[error("empty file: {0}")]
    Empty(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to create preview: {0}")]
    Preview(#[source] std::io::Error),
}

impl IntakeError {
    /// Short reason suitable for a notification.
    pub fn reason(&self) -> &'static str {
        match self {
            IntakeError::NotAnImage { .. } => "not an image",
            IntakeError::TooLarge { .. } => "too large",
            IntakeError::Empty(_) => "empty file",
            IntakeError::Read { .. } => "unreadable file",
            IntakeError::Preview(_) => "preview unavailable",
        }
    }
}
