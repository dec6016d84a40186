//! Namespaced object storage for CLAIRE: `{org}/{bucket}/{key…}` over either
//! the local filesystem or S3, behind one [`StorageBackend`] trait.

mod backend;
mod error;
mod local;
mod s3;
mod types;

pub use backend::StorageBackend;
pub use error::StorageError;
pub use local::LocalFsBackend;
pub use s3::S3Backend;
pub use types::{Bucket, ListEntry, ListPage, ObjectMetadata, PresignMethod, StoredObject};

/// The behavioral contract every [`StorageBackend`] implementation must
/// satisfy, exercised against both [`LocalFsBackend`] and (where
/// credentials are available) [`S3Backend`].
///
/// Kept as a reusable function rather than duplicated per-backend test
/// bodies, so a new backend only has to be plugged into `contract::run`.
#[cfg(test)]
mod contract {
    use bytes::Bytes;

    use super::*;

    pub async fn run(backend: &dyn StorageBackend) {
        // put then get yields identical bytes (no implicit transcoding).
        let payload = Bytes::from_static(b"\x00\x01binary\xffdata");
        backend
            .put(Bucket::Eln, "contract/obj", payload.clone(), "application/octet-stream")
            .await
            .unwrap();
        let fetched = backend.get(Bucket::Eln, "contract/obj").await.unwrap();
        assert_eq!(fetched.bytes, payload);

        // head reports the same size as the bytes written.
        let meta = backend.head(Bucket::Eln, "contract/obj").await.unwrap();
        assert_eq!(meta.size, payload.len() as u64);

        // put is idempotent on identical bytes.
        backend
            .put(Bucket::Eln, "contract/obj", payload.clone(), "application/octet-stream")
            .await
            .unwrap();
        let fetched_again = backend.get(Bucket::Eln, "contract/obj").await.unwrap();
        assert_eq!(fetched_again.bytes, payload);

        // delete is idempotent.
        backend.delete(Bucket::Eln, "contract/obj").await.unwrap();
        backend.delete(Bucket::Eln, "contract/obj").await.unwrap();
        assert!(backend.get(Bucket::Eln, "contract/obj").await.is_err());
    }
}
