//! sagal-core
//!
//! Pure domain types, image intake validation, and storage key conventions.
//! No AWS SDK or HTTP dependency. This is the shared vocabulary of the
//! blood-smear lab pipeline.

use std::future::Future;
use std::pin::Pin;

pub mod error;
pub mod intake;
pub mod keys;
pub mod models;

/// Boxed future used at the async trait seams (object store, classifier).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
