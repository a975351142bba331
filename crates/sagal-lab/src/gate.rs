//! Result gating.
//!
//! Applies the domain policy to a raw prediction and, only for accepted
//! predictions, stores the original image. The out-of-domain check always
//! runs before the upload so rejected input is never written to storage.

use std::sync::Arc;
use std::time::Duration;

use sagal_core::intake::ImageSubmission;
use sagal_core::keys;
use sagal_core::models::{Confidence, Label, OUT_OF_DOMAIN_LABEL, PredictionResult};
use sagal_storage::ObjectStore;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{LabError, Stage};

pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// An accepted, storage-backed diagnostic result.
///
/// Only [`ResultGate::gate`] builds one, so a value in hand always means the
/// label passed the domain check and the image upload succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GatedDiagnosticResult {
    label: Label,
    #[serde(rename = "score")]
    confidence: Confidence,
    image_url: String,
    #[serde(default = "Uuid::nil")]
    submission_id: Uuid,
}

impl GatedDiagnosticResult {
    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    /// Nil for entries staged before submission IDs were recorded.
    pub fn submission_id(&self) -> Uuid {
        self.submission_id
    }
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    pub out_of_domain_label: String,
    pub upload_timeout: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            out_of_domain_label: OUT_OF_DOMAIN_LABEL.to_string(),
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }
}

pub struct ResultGate {
    store: Arc<dyn ObjectStore>,
    config: GateConfig,
}

impl ResultGate {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self::with_config(store, GateConfig::default())
    }

    pub fn with_config(store: Arc<dyn ObjectStore>, config: GateConfig) -> Self {
        Self { store, config }
    }

    /// Accept or reject a prediction.
    ///
    /// Accepted predictions cause exactly one upload of the submission's
    /// original bytes; nothing else is written.
    pub async fn gate(
        &self,
        result: PredictionResult,
        submission: &ImageSubmission,
    ) -> Result<GatedDiagnosticResult, LabError> {
        if result.label.as_str() == self.config.out_of_domain_label {
            warn!(
                submission_id = %submission.id(),
                label = %result.label,
                confidence = %result.confidence,
                "prediction rejected as out of domain"
            );
            return Err(LabError::DomainMismatch {
                label: result.label.to_string(),
            });
        }

        if !result.label.is_diagnostic() {
            warn!(
                submission_id = %submission.id(),
                label = %result.label,
                "accepting label outside the known diagnostic set"
            );
        }

        let key = keys::blood_image(Uuid::new_v4(), submission.extension());
        let upload = self
            .store
            .upload(&key, submission.bytes().to_vec(), submission.mime_type());

        let stored = tokio::time::timeout(self.config.upload_timeout, upload)
            .await
            .map_err(|_| LabError::Timeout {
                stage: Stage::Upload,
                after: self.config.upload_timeout,
            })?
            .map_err(|e| LabError::Persistence(e.to_string()))?;

        let image_url = self.store.public_url(&stored.path);

        info!(
            submission_id = %submission.id(),
            label = %result.label,
            confidence = %result.confidence,
            path = %stored.path,
            "prediction accepted, image stored"
        );

        Ok(GatedDiagnosticResult {
            label: result.label,
            confidence: result.confidence,
            image_url,
            submission_id: submission.id(),
        })
    }
}
