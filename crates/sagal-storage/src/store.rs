use sagal_core::BoxFuture;

use crate::error::StorageError;

/// Where an uploaded object ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub path: String,
}

/// Durable object storage consumed by the gate and the record workflow.
pub trait ObjectStore: Send + Sync {
    /// Write `body` under `key`, replacing any existing object.
    fn upload<'a>(
        &'a self,
        key: &'a str,
        body: Vec<u8>,
        content_type: &'a str,
    ) -> BoxFuture<'a, Result<StoredObject, StorageError>>;

    /// Read an object. Missing keys are `StorageError::NotFound`.
    fn download<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>, StorageError>>;

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StorageError>>;

    /// Keys under a prefix, in lexical order.
    fn list<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, Result<Vec<String>, StorageError>>;

    /// Public URL of a stored path. Pure; never fails.
    fn public_url(&self, path: &str) -> String;
}
