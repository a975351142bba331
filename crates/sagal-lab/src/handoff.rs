//! Hand-off slot between the analysis pipeline and the record workflow.
//!
//! One well-known key, last write wins. Reads never clear the slot; the
//! record workflow clears it after it has saved a record, and a new image
//! selection clears it to abandon a stale result.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use sagal_core::keys;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::HandoffError;
use crate::gate::GatedDiagnosticResult;

/// Raw key-value storage behind the hand-off slot.
pub trait SlotStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, HandoffError>;
    fn write(&self, key: &str, value: &[u8]) -> Result<(), HandoffError>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), HandoffError>;
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileSlotStore {
    dir: PathBuf,
}

impl FileSlotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SlotStore for FileSlotStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, HandoffError> {
        match std::fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), HandoffError> {
        std::fs::create_dir_all(&self.dir)?;

        // Write to a temp file then rename so readers never see a partial value.
        let tmp_path = self.dir.join(format!("{key}.json.tmp"));
        std::fs::write(&tmp_path, value)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
        }

        std::fs::rename(&tmp_path, self.path_for(key))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), HandoffError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySlotStore {
    slots: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SlotStore for MemorySlotStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, HandoffError> {
        let slots = self.slots.lock().map_err(|_| HandoffError::Poisoned)?;
        Ok(slots.get(key).cloned())
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), HandoffError> {
        let mut slots = self.slots.lock().map_err(|_| HandoffError::Poisoned)?;
        slots.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), HandoffError> {
        let mut slots = self.slots.lock().map_err(|_| HandoffError::Poisoned)?;
        slots.remove(key);
        Ok(())
    }
}

/// What is actually written to the slot: the result's own fields plus the
/// staging time.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "UncheckedEnvelope")]
struct StagedEnvelope {
    #[serde(flatten)]
    result: GatedDiagnosticResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    staged_at: Option<jiff::Timestamp>,
}

/// Slot contents as read, before the gate's guarantees are re-checked.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UncheckedEnvelope {
    #[serde(flatten)]
    result: GatedDiagnosticResult,
    #[serde(default)]
    staged_at: Option<jiff::Timestamp>,
}

impl TryFrom<UncheckedEnvelope> for StagedEnvelope {
    type Error = String;

    fn try_from(raw: UncheckedEnvelope) -> Result<Self, Self::Error> {
        let label = raw.result.label();
        if label.as_str().trim().is_empty() {
            return Err("staged result has an empty label".to_string());
        }
        if label.is_out_of_domain() {
            return Err(format!("staged result carries out-of-domain label {label}"));
        }
        if raw.result.image_url().trim().is_empty() {
            return Err("staged result has no image URL".to_string());
        }
        Ok(Self {
            result: raw.result,
            staged_at: raw.staged_at,
        })
    }
}

pub struct HandoffStore<S> {
    slot: S,
    key: String,
    ttl: Option<Duration>,
}

impl<S: SlotStore> HandoffStore<S> {
    pub fn new(slot: S) -> Self {
        Self {
            slot,
            key: keys::HANDOFF_SLOT.to_string(),
            ttl: None,
        }
    }

    /// Entries older than `ttl` read as empty.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Overwrite the slot with `result`. Any unconsumed value is lost.
    pub fn stage(&self, result: &GatedDiagnosticResult) -> Result<(), HandoffError> {
        let envelope = StagedEnvelope {
            result: result.clone(),
            staged_at: Some(jiff::Timestamp::now()),
        };
        let bytes = serde_json::to_vec(&envelope)?;
        self.slot.write(&self.key, &bytes)?;

        info!(
            key = %self.key,
            submission_id = %result.submission_id(),
            label = %result.label(),
            "lab result staged"
        );
        Ok(())
    }

    /// Read the staged result without clearing it.
    pub fn consume(&self) -> Result<Option<GatedDiagnosticResult>, HandoffError> {
        let Some(bytes) = self.slot.read(&self.key)? else {
            return Ok(None);
        };
        let envelope: StagedEnvelope = serde_json::from_slice(&bytes)?;

        if let (Some(ttl), Some(staged_at)) = (self.ttl, envelope.staged_at) {
            let age_secs = jiff::Timestamp::now().as_second() - staged_at.as_second();
            let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
            if age_secs > ttl_secs {
                debug!(key = %self.key, age_secs, "staged lab result expired");
                return Ok(None);
            }
        }

        Ok(Some(envelope.result))
    }

    pub fn clear(&self) -> Result<(), HandoffError> {
        self.slot.remove(&self.key)?;
        debug!(key = %self.key, "hand-off slot cleared");
        Ok(())
    }
}
