use aws_sdk_s3::Client;
use aws_smithy_types::byte_stream::ByteStream;
use sagal_core::BoxFuture;
use tracing::debug;

use crate::error::StorageError;
use crate::store::{ObjectStore, StoredObject};

/// S3-backed object store.
///
/// Public URLs are built from `public_base_url`, which defaults to the
/// bucket's virtual-hosted endpoint. Point it at a CDN when the bucket is
/// fronted by one.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: impl Into<String>, region: &str) -> Self {
        let bucket = bucket.into();
        let public_base_url = format!("https://{bucket}.s3.{region}.amazonaws.com");
        Self {
            client,
            bucket,
            public_base_url,
        }
    }

    pub fn with_public_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.public_base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::PutObject(e.into_service_error().to_string()))?;

        debug!(bucket = %self.bucket, key, size, "object stored");
        Ok(StoredObject {
            path: key.to_string(),
        })
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let err = e.into_service_error();
                if err.is_no_such_key() {
                    StorageError::NotFound {
                        key: key.to_string(),
                    }
                } else {
                    StorageError::GetObject(err.to_string())
                }
            })?;

        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| StorageError::GetObject(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(body)
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::DeleteObject(e.into_service_error().to_string()))?;

        Ok(())
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut req = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);

            if let Some(token) = &continuation_token {
                req = req.continuation_token(token);
            }

            let resp = req
                .send()
                .await
                .map_err(|e| StorageError::ListObjects(e.into_service_error().to_string()))?;

            keys.extend(resp.contents().iter().filter_map(|o| o.key().map(str::to_string)));

            if resp.is_truncated() == Some(true) {
                continuation_token = resp.next_continuation_token().map(|s| s.to_string());
            } else {
                break;
            }
        }

        keys.sort();
        Ok(keys)
    }
}

impl ObjectStore for S3ObjectStore {
    fn upload<'a>(
        &'a self,
        key: &'a str,
        body: Vec<u8>,
        content_type: &'a str,
    ) -> BoxFuture<'a, Result<StoredObject, StorageError>> {
        Box::pin(self.put_object(key, body, content_type))
    }

    fn download<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>, StorageError>> {
        Box::pin(self.get_object(key))
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(self.delete_object(key))
    }

    fn list<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, Result<Vec<String>, StorageError>> {
        Box::pin(self.list_objects(prefix))
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url, path.trim_start_matches('/'))
    }
}
