//! Blob storage for listing media.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{config::DEFAULT_PLACEHOLDER_URL, error::Error};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub bucket: String,
    pub path: String,
    pub url: String,
    /// blake3 of the content, hex encoded.
    pub etag: String,
    pub size: usize,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` at `bucket/path`. An occupied path is a conflict
    /// unless `upsert` is set.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        upsert: bool,
    ) -> Result<StoredObject, Error>;

    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>, Error>;

    async fn remove(&self, bucket: &str, paths: &[&str]) -> Result<usize, Error>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// Keeps objects in memory. `public_url` always hands out the configured
/// placeholder, whatever the path.
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    placeholder_url: String,
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new(DEFAULT_PLACEHOLDER_URL)
    }
}

impl MemoryBlobStore {
    pub fn new(placeholder_url: impl Into<String>) -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            placeholder_url: placeholder_url.into(),
        }
    }

    pub fn from_config(config: &crate::Config) -> Self {
        Self::new(config.placeholder_url.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn key(bucket: &str, path: &str) -> (String, String) {
    (
        bucket.to_string(),
        path.trim_start_matches('/').to_string(),
    )
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        upsert: bool,
    ) -> Result<StoredObject, Error> {
        let key = key(bucket, path);
        if key.1.is_empty() {
            return Err(Error::Validation("object path is empty".to_string()));
        }

        let etag = blake3::hash(&bytes).to_hex().to_string();
        let size = bytes.len();

        {
            let mut objects = self.objects.lock().map_err(|_| Error::Poisoned)?;
            if !upsert && objects.contains_key(&key) {
                return Err(Error::Conflict(format!(
                    "object already exists: {}/{}",
                    key.0, key.1
                )));
            }
            objects.insert(key.clone(), bytes);
        }

        debug!(bucket = %key.0, path = %key.1, size, "blob stored");

        Ok(StoredObject {
            url: self.public_url(bucket, path),
            bucket: key.0,
            path: key.1,
            etag,
            size,
        })
    }

    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>, Error> {
        self.objects
            .lock()
            .map_err(|_| Error::Poisoned)?
            .get(&key(bucket, path))
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn remove(&self, bucket: &str, paths: &[&str]) -> Result<usize, Error> {
        let mut objects = self.objects.lock().map_err(|_| Error::Poisoned)?;
        Ok(paths
            .iter()
            .filter(|p| objects.remove(&key(bucket, p)).is_some())
            .count())
    }

    fn public_url(&self, _bucket: &str, _path: &str) -> String {
        self.placeholder_url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_returns_placeholder_url_and_etag() {
        let store = MemoryBlobStore::default();
        let stored = store
            .upload("car-images", "7/image_0.jpg", b"jpeg".to_vec(), false)
            .await
            .unwrap();
        assert_eq!(stored.url, "/placeholder.svg");
        assert_eq!(stored.etag, blake3::hash(b"jpeg").to_hex().to_string());
        assert_eq!(stored.size, 4);
        assert_eq!(
            store.download("car-images", "7/image_0.jpg").await.unwrap(),
            b"jpeg"
        );
    }

    #[tokio::test]
    async fn test_upload_conflict_without_upsert() {
        let store = MemoryBlobStore::default();
        store
            .upload("car-images", "7/video.mp4", vec![1], false)
            .await
            .unwrap();
        let err = store
            .upload("car-images", "7/video.mp4", vec![2], false)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "conflict");

        store
            .upload("car-images", "7/video.mp4", vec![2], true)
            .await
            .unwrap();
        assert_eq!(
            store.download("car-images", "7/video.mp4").await.unwrap(),
            vec![2]
        );
    }

    #[tokio::test]
    async fn test_remove_counts_existing_only() {
        let store = MemoryBlobStore::default();
        store.upload("b", "a.jpg", vec![0], false).await.unwrap();
        assert_eq!(store.remove("b", &["a.jpg", "missing.jpg"]).await.unwrap(), 1);
        assert!(store.is_empty());
        assert_eq!(
            store.download("b", "a.jpg").await.unwrap_err(),
            Error::NotFound
        );
    }
}
