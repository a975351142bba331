//! sagal-lab
//!
//! The smear analysis pipeline: intake, classification, result gating,
//! hand-off staging, and the patient-record workflow that consumes the
//! staged result.

pub mod error;
pub mod gate;
pub mod handoff;
pub mod records;
pub mod session;

pub use error::{ErrorKind, LabError, Stage};
pub use gate::{GateConfig, GatedDiagnosticResult, ResultGate};
pub use handoff::{FileSlotStore, HandoffStore, MemorySlotStore, SlotStore};
pub use records::RecordBook;
pub use session::LabSession;
