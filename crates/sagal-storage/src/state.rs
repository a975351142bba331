use serde::{de::DeserializeOwned, Serialize};

use crate::error::StorageError;
use crate::store::{ObjectStore, StoredObject};

/// Load a JSON document from the store.
pub async fn load_state<T: DeserializeOwned>(
    store: &dyn ObjectStore,
    key: &str,
) -> Result<T, StorageError> {
    let body = store.download(key).await?;
    let value: T = serde_json::from_slice(&body)?;
    Ok(value)
}

/// Save a JSON document to the store, replacing any previous version.
pub async fn save_state<T: Serialize>(
    store: &dyn ObjectStore,
    key: &str,
    value: &T,
) -> Result<StoredObject, StorageError> {
    let body = serde_json::to_vec_pretty(value)?;
    store.upload(key, body, "application/json").await
}

/// Load every JSON document under a prefix.
pub async fn load_all<T: DeserializeOwned>(
    store: &dyn ObjectStore,
    prefix: &str,
) -> Result<Vec<T>, StorageError> {
    let keys = store.list(prefix).await?;
    let mut values = Vec::with_capacity(keys.len());
    for key in &keys {
        values.push(load_state(store, key).await?);
    }
    Ok(values)
}
