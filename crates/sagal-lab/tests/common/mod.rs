#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use sagal_core::BoxFuture;
use sagal_core::intake::{ImageIntakeValidator, ImageSubmission, RawImage};
use sagal_lab::GatedDiagnosticResult;
use sagal_storage::error::StorageError;
use sagal_storage::{ObjectStore, StoredObject};
use serde_json::json;

pub const CDN: &str = "https://cdn.sagal.example";

pub fn jpeg(size: usize) -> RawImage {
    RawImage::new("smear.jpg", "image/jpeg", vec![b'j'; size])
}

pub fn png() -> RawImage {
    RawImage::new("slide.png", "image/png", b"png-bytes".to_vec())
}

pub fn submission() -> ImageSubmission {
    ImageIntakeValidator::default().validate(jpeg(1024)).unwrap()
}

pub fn staged(label: &str, score: f64, url: &str) -> GatedDiagnosticResult {
    serde_json::from_value(json!({ "label": label, "score": score, "imageUrl": url })).unwrap()
}

/// Rejects every upload and counts the attempts.
#[derive(Default)]
pub struct FailingStore {
    pub uploads: AtomicUsize,
}

impl FailingStore {
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

impl ObjectStore for FailingStore {
    fn upload<'a>(
        &'a self,
        _key: &'a str,
        _body: Vec<u8>,
        _content_type: &'a str,
    ) -> BoxFuture<'a, Result<StoredObject, StorageError>> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Err(StorageError::PutObject("bucket unavailable".to_string())) })
    }

    fn download<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>, StorageError>> {
        Box::pin(async move {
            Err(StorageError::NotFound {
                key: key.to_string(),
            })
        })
    }

    fn delete<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(async { Ok(()) })
    }

    fn list<'a>(&'a self, _prefix: &'a str) -> BoxFuture<'a, Result<Vec<String>, StorageError>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn public_url(&self, path: &str) -> String {
        format!("{CDN}/{path}")
    }
}

/// Accepts uploads only after a long delay.
pub struct SlowStore {
    pub delay: Duration,
}

impl ObjectStore for SlowStore {
    fn upload<'a>(
        &'a self,
        key: &'a str,
        _body: Vec<u8>,
        _content_type: &'a str,
    ) -> BoxFuture<'a, Result<StoredObject, StorageError>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            Ok(StoredObject {
                path: key.to_string(),
            })
        })
    }

    fn download<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>, StorageError>> {
        Box::pin(async move {
            Err(StorageError::NotFound {
                key: key.to_string(),
            })
        })
    }

    fn delete<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(async { Ok(()) })
    }

    fn list<'a>(&'a self, _prefix: &'a str) -> BoxFuture<'a, Result<Vec<String>, StorageError>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn public_url(&self, path: &str) -> String {
        format!("{CDN}/{path}")
    }
}
