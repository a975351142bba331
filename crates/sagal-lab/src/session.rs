//! One clinician's analysis session: the currently selected image and the
//! linear intake → inference → gate → hand-off run over it.

use std::future::Future;

use sagal_core::intake::{ImageIntakeValidator, ImageSubmission, RawImage};
use sagal_inference::Classifier;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::LabError;
use crate::gate::{GatedDiagnosticResult, ResultGate};
use crate::handoff::{HandoffStore, SlotStore};

pub struct LabSession<C, S> {
    validator: ImageIntakeValidator,
    classifier: C,
    gate: ResultGate,
    handoff: HandoffStore<S>,
    current: Option<ImageSubmission>,
}

impl<C: Classifier, S: SlotStore> LabSession<C, S> {
    pub fn new(
        validator: ImageIntakeValidator,
        classifier: C,
        gate: ResultGate,
        handoff: HandoffStore<S>,
    ) -> Self {
        Self {
            validator,
            classifier,
            gate,
            handoff,
            current: None,
        }
    }

    /// Validate and select a new image.
    ///
    /// On success the previous submission is dropped (releasing its
    /// preview) and any result it staged is abandoned. A rejected file
    /// leaves the session as it was.
    pub fn select(&mut self, file: RawImage) -> Result<&ImageSubmission, LabError> {
        let submission = self
            .validator
            .validate(file)
            .inspect_err(|e| warn!(error = %e, "image rejected"))?;

        self.handoff.clear()?;

        info!(
            submission_id = %submission.id(),
            file_name = submission.file_name(),
            size = submission.size_bytes(),
            "image selected"
        );
        Ok(self.current.insert(submission))
    }

    pub fn current(&self) -> Option<&ImageSubmission> {
        self.current.as_ref()
    }

    /// Drop the current submission and its preview.
    pub fn discard(&mut self) {
        self.current = None;
    }

    pub fn handoff(&self) -> &HandoffStore<S> {
        &self.handoff
    }

    /// Classify the current image, gate the prediction, and stage the
    /// accepted result.
    ///
    /// Steps run strictly in order. Any failure, including cancellation,
    /// leaves the hand-off slot untouched.
    pub async fn analyze(
        &self,
        cancel: &CancellationToken,
    ) -> Result<GatedDiagnosticResult, LabError> {
        let submission = self.current.as_ref().ok_or(LabError::NoSubmission)?;

        let prediction = until_cancelled(cancel, self.classifier.classify(submission)).await??;
        let gated = until_cancelled(cancel, self.gate.gate(prediction, submission)).await??;

        self.handoff.stage(&gated)?;
        Ok(gated)
    }
}

async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, LabError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(LabError::Cancelled),
        out = fut => Ok(out),
    }
}
