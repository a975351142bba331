//! Object key conventions.
//!
//! Pure string functions. These define the canonical layout of objects in
//! the lab bucket and the name of the local hand-off slot.

use uuid::Uuid;

pub const BLOOD_IMAGES_PREFIX: &str = "blood-images/";

pub fn blood_image(id: Uuid, extension: &str) -> String {
    format!("{BLOOD_IMAGES_PREFIX}{id}.{extension}")
}

pub const PATIENT_RECORDS_PREFIX: &str = "patient-records/";

pub fn patient_record(id: Uuid) -> String {
    format!("{PATIENT_RECORDS_PREFIX}{id}.json")
}

/// Well-known key of the single hand-off slot read by the record workflow.
pub const HANDOFF_SLOT: &str = "lab_result";
