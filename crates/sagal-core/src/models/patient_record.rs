use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::CoreError;

/// A persisted patient record created from a staged lab result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PatientRecord {
    pub id: Uuid,
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    /// Diagnostic label of the smear analysis. Fixed once the record exists.
    pub result: String,
    pub doctors_verdict: String,
    /// Stored smear image. Fixed once the record exists.
    pub blood_image_url: Option<String>,
    pub created_at: jiff::Timestamp,
    pub updated_at: jiff::Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => f.write_str("Male"),
            Gender::Female => f.write_str("Female"),
        }
    }
}

impl FromStr for Gender {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            other => Err(CoreError::InvalidGender(other.to_string())),
        }
    }
}

/// Clinician-entered fields of a patient record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecordDraft {
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub doctors_verdict: String,
}

impl PatientRecordDraft {
    /// Every field is required; age must be positive.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::MissingField("name".to_string()));
        }
        if self.age == 0 {
            return Err(CoreError::MissingField("age".to_string()));
        }
        if self.doctors_verdict.trim().is_empty() {
            return Err(CoreError::MissingField("doctors_verdict".to_string()));
        }
        Ok(())
    }

    /// Copy the editable fields onto an existing record.
    pub fn apply_to(&self, record: &mut PatientRecord, now: jiff::Timestamp) {
        record.name = self.name.trim().to_string();
        record.age = self.age;
        record.gender = self.gender;
        record.doctors_verdict = self.doctors_verdict.trim().to_string();
        record.updated_at = now;
    }
}
