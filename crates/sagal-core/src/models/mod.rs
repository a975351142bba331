pub mod patient_record;
pub mod prediction;

pub use patient_record::{Gender, PatientRecord, PatientRecordDraft};
pub use prediction::{Confidence, Label, PredictionResult, DIAGNOSTIC_LABELS, OUT_OF_DOMAIN_LABEL};
