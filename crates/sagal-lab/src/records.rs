//! Patient-record workflow fed by the hand-off slot.

use std::sync::Arc;

use sagal_core::keys;
use sagal_core::models::{PatientRecord, PatientRecordDraft};
use sagal_storage::ObjectStore;
use sagal_storage::error::StorageError;
use sagal_storage::state::{load_all, load_state, save_state};
use tracing::info;
use uuid::Uuid;

use crate::error::LabError;
use crate::handoff::{HandoffStore, SlotStore};

pub struct RecordBook {
    store: Arc<dyn ObjectStore>,
}

impl RecordBook {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Create a record from the staged lab result and clinician input.
    ///
    /// The hand-off slot is cleared only after the record is saved; a
    /// failed save leaves the staged result in place for another attempt.
    pub async fn create_from_handoff<S: SlotStore>(
        &self,
        handoff: &HandoffStore<S>,
        draft: PatientRecordDraft,
    ) -> Result<PatientRecord, LabError> {
        draft
            .validate()
            .map_err(|e| LabError::InvalidRecord(e.to_string()))?;

        let staged = handoff.consume()?.ok_or(LabError::NothingStaged)?;

        let now = jiff::Timestamp::now();
        let record = PatientRecord {
            id: Uuid::new_v4(),
            name: draft.name.trim().to_string(),
            age: draft.age,
            gender: draft.gender,
            result: staged.label().to_string(),
            doctors_verdict: draft.doctors_verdict.trim().to_string(),
            blood_image_url: Some(staged.image_url().to_string()),
            created_at: now,
            updated_at: now,
        };

        save_state(&*self.store, &keys::patient_record(record.id), &record)
            .await
            .map_err(LabError::RecordStorage)?;

        handoff.clear()?;

        info!(
            record_id = %record.id,
            submission_id = %staged.submission_id(),
            result = %record.result,
            "patient record created"
        );
        Ok(record)
    }

    /// Replace the clinician-entered fields. The lab result and image stay
    /// as they were recorded.
    pub async fn update(
        &self,
        id: Uuid,
        draft: PatientRecordDraft,
    ) -> Result<PatientRecord, LabError> {
        draft
            .validate()
            .map_err(|e| LabError::InvalidRecord(e.to_string()))?;

        let mut record = self.get(id).await?;
        draft.apply_to(&mut record, jiff::Timestamp::now());

        save_state(&*self.store, &keys::patient_record(id), &record)
            .await
            .map_err(LabError::RecordStorage)?;

        info!(record_id = %id, "patient record updated");
        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Result<PatientRecord, LabError> {
        load_state(&*self.store, &keys::patient_record(id))
            .await
            .map_err(|e| match e {
                StorageError::NotFound { .. } => LabError::RecordNotFound(id),
                other => LabError::RecordStorage(other),
            })
    }

    /// All records, newest first.
    pub async fn list(&self) -> Result<Vec<PatientRecord>, LabError> {
        let mut records: Vec<PatientRecord> = load_all(&*self.store, keys::PATIENT_RECORDS_PREFIX)
            .await
            .map_err(LabError::RecordStorage)?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}
