use std::fmt;
use std::time::Duration;

use sagal_core::error::IntakeError;
use sagal_inference::error::InferenceError;
use sagal_storage::error::StorageError;
use thiserror::Error;
use uuid::Uuid;

/// Suspension points of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Inference,
    Upload,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Inference => f.write_str("inference"),
            Stage::Upload => f.write_str("image upload"),
        }
    }
}

#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("hand-off slot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("hand-off slot holds malformed data: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("hand-off slot lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum LabError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] IntakeError),

    #[error("inference service unavailable: {0}")]
    InferenceUnavailable(String),

    #[error("inference response malformed: {0}")]
    InferenceProtocol(String),

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: Stage, after: Duration },

    #[error("not a valid blood smear sample (classified as {label})")]
    DomainMismatch { label: String },

    #[error("failed to store image: {0}")]
    Persistence(String),

    #[error(transparent)]
    Handoff(#[from] HandoffError),

    #[error("analysis cancelled")]
    Cancelled,

    #[error("no image selected")]
    NoSubmission,

    #[error("no staged lab result to record")]
    NothingStaged,

    #[error("invalid patient record: {0}")]
    InvalidRecord(String),

    #[error("patient record not found: {0}")]
    RecordNotFound(Uuid),

    #[error("patient record storage error: {0}")]
    RecordStorage(#[source] StorageError),
}

/// Coarse failure category. Timeouts fold into the failure path of the
/// step that timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    InferenceUnavailable,
    InferenceProtocol,
    DomainMismatch,
    Persistence,
    Handoff,
    Cancelled,
    Record,
}

impl LabError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LabError::InvalidInput(_) | LabError::NoSubmission => ErrorKind::InvalidInput,
            LabError::InferenceUnavailable(_)
            | LabError::Timeout {
                stage: Stage::Inference,
                ..
            } => ErrorKind::InferenceUnavailable,
            LabError::InferenceProtocol(_) => ErrorKind::InferenceProtocol,
            LabError::DomainMismatch { .. } => ErrorKind::DomainMismatch,
            LabError::Persistence(_)
            | LabError::Timeout {
                stage: Stage::Upload,
                ..
            } => ErrorKind::Persistence,
            LabError::Handoff(_) => ErrorKind::Handoff,
            LabError::Cancelled => ErrorKind::Cancelled,
            LabError::NothingStaged
            | LabError::InvalidRecord(_)
            | LabError::RecordNotFound(_)
            | LabError::RecordStorage(_) => ErrorKind::Record,
        }
    }

    /// Notification text shown to the clinician.
    pub fn user_message(&self) -> &'static str {
        match self {
            LabError::InvalidInput(IntakeError::NotAnImage { .. }) => {
                "Please select an image file."
            }
            LabError::InvalidInput(IntakeError::TooLarge { .. }) => "Image is too large.",
            LabError::InvalidInput(_) => "The selected file could not be used.",
            LabError::NoSubmission => "Select a blood smear image first.",
            LabError::InferenceUnavailable(_) => {
                "The analysis service is unavailable. Please try again."
            }
            LabError::Timeout {
                stage: Stage::Inference,
                ..
            } => "The analysis service did not respond in time. Please try again.",
            LabError::Timeout {
                stage: Stage::Upload,
                ..
            } => "Storing the image took too long. Please try again.",
            LabError::InferenceProtocol(_) => {
                "The analysis service returned an unexpected response."
            }
            LabError::DomainMismatch { .. } => "Please upload a valid blood smear image.",
            LabError::Persistence(_) => "Failed to upload image.",
            LabError::Handoff(_) => "The lab result could not be staged for recording.",
            LabError::Cancelled => "Analysis cancelled.",
            LabError::NothingStaged => "There is no lab result waiting to be recorded.",
            LabError::InvalidRecord(_) => "Please fill in all fields.",
            LabError::RecordNotFound(_) => "Patient record not found.",
            LabError::RecordStorage(_) => "Saving the patient record failed.",
        }
    }
}

impl From<InferenceError> for LabError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::Transport(_)
            | InferenceError::Status { .. }
            | InferenceError::Config(_) => LabError::InferenceUnavailable(err.to_string()),
            InferenceError::Protocol(msg) => LabError::InferenceProtocol(msg),
            InferenceError::Timeout(after) => LabError::Timeout {
                stage: Stage::Inference,
                after,
            },
        }
    }
}
