use std::collections::BTreeMap;

use sagal_core::BoxFuture;
use tokio::sync::Mutex;

use crate::error::StorageError;
use crate::store::{ObjectStore, StoredObject};

#[derive(Debug, Clone)]
struct MemoryObject {
    body: Vec<u8>,
    content_type: String,
}

/// Process-local object store, mainly for tests.
#[derive(Debug)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, MemoryObject>>,
    public_base_url: String,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new("memory://objects")
    }
}

impl MemoryObjectStore {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.lock().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }

    pub async fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .await
            .get(key)
            .map(|o| o.content_type.clone())
    }
}

impl ObjectStore for MemoryObjectStore {
    fn upload<'a>(
        &'a self,
        key: &'a str,
        body: Vec<u8>,
        content_type: &'a str,
    ) -> BoxFuture<'a, Result<StoredObject, StorageError>> {
        Box::pin(async move {
            self.objects.lock().await.insert(
                key.to_string(),
                MemoryObject {
                    body,
                    content_type: content_type.to_string(),
                },
            );
            Ok(StoredObject {
                path: key.to_string(),
            })
        })
    }

    fn download<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>, StorageError>> {
        Box::pin(async move {
            self.objects
                .lock()
                .await
                .get(key)
                .map(|o| o.body.clone())
                .ok_or_else(|| StorageError::NotFound {
                    key: key.to_string(),
                })
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(async move {
            self.objects.lock().await.remove(key);
            Ok(())
        })
    }

    fn list<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, Result<Vec<String>, StorageError>> {
        Box::pin(async move {
            Ok(self
                .objects
                .lock()
                .await
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect())
        })
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url, path.trim_start_matches('/'))
    }
}
