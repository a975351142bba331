//! sagal-inference
//!
//! Client for the external blood-smear classification service: multipart
//! image upload, strict response parsing, and an optional bounded retry.

pub mod client;
pub mod error;
pub mod response;
pub mod retry;

pub use client::{Classifier, InferenceClient, InferenceConfig};
pub use retry::RetryPolicy;
