//! sagal-storage
//!
//! Object storage for smear images and patient records. An `ObjectStore`
//! seam with an S3 backend (thin wrapper around the AWS S3 SDK) and an
//! in-memory backend.

pub mod error;
pub mod memory;
pub mod s3;
pub mod state;
pub mod store;

pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;
pub use store::{ObjectStore, StoredObject};
