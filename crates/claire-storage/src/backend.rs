//! The `StorageBackend` trait every storage implementation satisfies.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StorageError;
use crate::types::{Bucket, ListPage, ObjectMetadata, StoredObject};

/// A namespaced key/value object store over `{org}/{bucket}/{key…}`.
///
/// Every implementation is exercised by the same behavioral test suite
/// (`tests::contract`, instantiated once per backend) so callers can treat
/// the two implementations as interchangeable.
#[async_trait]
pub trait StorageBackend: std::fmt::Debug + Send + Sync {
    /// Write `bytes` at `bucket`/`key`, recording `media_type`.
    ///
    /// Idempotent on identical bytes: a `put` of the same content to the
    /// same key is a no-op from the caller's perspective. Byte-for-byte
    /// content is preserved — no transcoding of any kind.
    ///
    /// # Errors
    /// Returns [`StorageError::Unavailable`] if the backend cannot be
    /// reached within its retry budget.
    async fn put(
        &self,
        bucket: Bucket,
        key: &str,
        bytes: Bytes,
        media_type: &str,
    ) -> Result<(), StorageError>;

    /// Read the bytes and media type stored at `bucket`/`key`.
    ///
    /// # Errors
    /// Returns [`StorageError::NotFound`] if no object exists at that key.
    async fn get(&self, bucket: Bucket, key: &str) -> Result<StoredObject, StorageError>;

    /// Read metadata for the object at `bucket`/`key` without fetching its
    /// bytes.
    ///
    /// # Errors
    /// Returns [`StorageError::NotFound`] if no object exists at that key.
    async fn head(&self, bucket: Bucket, key: &str) -> Result<ObjectMetadata, StorageError>;

    /// List objects under `prefix`, paginated by `cursor` and bounded by
    /// `limit`.
    async fn list(
        &self,
        bucket: Bucket,
        prefix: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<ListPage, StorageError>;

    /// Delete the object at `bucket`/`key`. Idempotent: deleting an
    /// already-absent key succeeds.
    async fn delete(&self, bucket: Bucket, key: &str) -> Result<(), StorageError>;

    /// Issue a URL authorizing a single PUT to `bucket`/`key`, valid for
    /// `ttl_seconds`.
    async fn presign_put(
        &self,
        bucket: Bucket,
        key: &str,
        ttl_seconds: u64,
        media_type: &str,
    ) -> Result<String, StorageError>;

    /// Issue a URL authorizing a single GET from `bucket`/`key`, valid for
    /// `ttl_seconds`.
    async fn presign_get(
        &self,
        bucket: Bucket,
        key: &str,
        ttl_seconds: u64,
    ) -> Result<String, StorageError>;
}
