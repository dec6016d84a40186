//! `FileStore`: upload, integrity verification, and orphan sweep.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use claire_core::FilesConfig;
use claire_storage::{Bucket, StorageBackend};
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::FilesError;
use crate::model::FileRecord;
use crate::sniff::is_accepted;

/// A presigned upload reservation handed back to a client.
#[derive(Debug, Clone)]
pub struct PresignedUpload {
    /// The URL the client PUTs bytes to.
    pub url: String,
    /// The file id to pass to [`FileStore::finalize_presigned`].
    pub file_id: String,
    /// When the presigned URL expires.
    pub expires_at: DateTime<Utc>,
}

fn random_nonce_hex(len: usize) -> String {
    let mut rng = rand::rng();
    let mut buf = vec![0u8; len];
    rng.fill(buf.as_mut_slice());
    hex::encode(buf)
}

fn derive_file_id(sha256_hex: &str) -> String {
    format!("{}-{}", &sha256_hex[..16], random_nonce_hex(4))
}

fn content_key(sop_id: Option<&str>, now: DateTime<Utc>, file_id: &str) -> String {
    let yyyy = now.format("%Y");
    let mm = now.format("%m");
    match sop_id {
        Some(sop_id) => format!("files/{sop_id}/{yyyy}/{mm}/{file_id}"),
        None => format!("files/{yyyy}/{mm}/{file_id}"),
    }
}

/// Records are kept in a flat, date-independent namespace so a bare
/// `file_id` (the only handle a submission body carries) resolves to its
/// record without needing to know the date prefix of its content key.
fn record_key(file_id: &str) -> String {
    format!("file-records/{file_id}.json")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Upload, integrity-verification, and sweep logic for binary attachments.
#[derive(Debug)]
pub struct FileStore {
    backend: Arc<dyn StorageBackend>,
    config: FilesConfig,
}

impl FileStore {
    /// Construct a file store over `backend`, governed by `config`.
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>, config: FilesConfig) -> Self {
        Self { backend, config }
    }

    async fn write_record(&self, record: &FileRecord) -> Result<(), FilesError> {
        let bytes =
            serde_json::to_vec(record).map_err(|e| FilesError::Internal(anyhow::anyhow!(e)))?;
        self.backend
            .put(
                Bucket::Eln,
                &record_key(&record.file_id),
                Bytes::from(bytes),
                "application/json",
            )
            .await?;
        Ok(())
    }

    /// Accept bytes routed through the HTTP surface. Rejects oversize,
    /// unsniffable-mismatched, or disallowed media types before any bytes
    /// are persisted.
    ///
    /// # Errors
    /// Returns [`FilesError::TooLarge`] or [`FilesError::MediaTypeRejected`]
    /// on rejection, or [`FilesError::Internal`] on a backend failure.
    pub async fn upload_inline(
        &self,
        owner: &str,
        sop_id: Option<&str>,
        original_name: &str,
        declared_media_type: &str,
        bytes: Bytes,
    ) -> Result<FileRecord, FilesError> {
        if bytes.len() as u64 > self.config.max_size_bytes_inline {
            return Err(FilesError::TooLarge);
        }
        if !is_accepted(&bytes, declared_media_type, &self.config.allowed_media_types) {
            return Err(FilesError::MediaTypeRejected(declared_media_type.to_owned()));
        }

        let sha256 = sha256_hex(&bytes);
        let file_id = derive_file_id(&sha256);
        let now = Utc::now();
        let key = content_key(sop_id, now, &file_id);

        self.backend
            .put(Bucket::Eln, &key, bytes.clone(), declared_media_type)
            .await?;

        let record = FileRecord {
            file_id: file_id.clone(),
            original_name: original_name.to_owned(),
            media_type: declared_media_type.to_owned(),
            size_bytes: bytes.len() as u64,
            sha256,
            owner: owner.to_owned(),
            created_at: now,
            storage_key: key,
            bound: false,
        };
        self.write_record(&record).await?;
        debug!(file_id, owner, "accepted inline upload");
        Ok(record)
    }

    /// Reserve a key and issue a presigned PUT URL for a client-driven
    /// upload. Writes a placeholder record so [`FileStore::finalize_presigned`]
    /// can resolve `file_id` back to its content key; the placeholder's
    /// `sha256` is empty until finalize succeeds.
    ///
    /// # Errors
    /// Returns [`FilesError::TooLarge`] or [`FilesError::MediaTypeRejected`]
    /// if the declared size/media type is rejected up front.
    pub async fn presign_upload(
        &self,
        owner: &str,
        sop_id: Option<&str>,
        declared_media_type: &str,
        declared_size: u64,
        ttl_seconds: u64,
    ) -> Result<PresignedUpload, FilesError> {
        if declared_size > self.config.max_size_bytes {
            return Err(FilesError::TooLarge);
        }
        if !self
            .config
            .allowed_media_types
            .iter()
            .any(|a| a == declared_media_type)
        {
            return Err(FilesError::MediaTypeRejected(declared_media_type.to_owned()));
        }

        let file_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let key = content_key(sop_id, now, &file_id);
        let url = self
            .backend
            .presign_put(Bucket::Eln, &key, ttl_seconds, declared_media_type)
            .await?;

        let placeholder = FileRecord {
            file_id: file_id.clone(),
            original_name: String::new(),
            media_type: declared_media_type.to_owned(),
            size_bytes: 0,
            sha256: String::new(),
            owner: owner.to_owned(),
            created_at: now,
            storage_key: key,
            bound: false,
        };
        self.write_record(&placeholder).await?;

        Ok(PresignedUpload {
            url,
            file_id,
            expires_at: now + chrono::Duration::seconds(i64::try_from(ttl_seconds).unwrap_or(i64::MAX)),
        })
    }

    /// Finalize a presigned upload: confirm existence via `head`, read back
    /// the bytes to compute the authoritative `sha256`, and reject anything
    /// that fails size, media-type, or hash verification. A rejected upload
    /// has its partial object deleted.
    ///
    /// # Errors
    /// Returns [`FilesError::NotFound`] if no reservation exists for
    /// `file_id`, [`FilesError::UploadIncomplete`] if nothing was uploaded,
    /// [`FilesError::MediaTypeRejected`] or [`FilesError::ChecksumMismatch`]
    /// on verification failure.
    pub async fn finalize_presigned(
        &self,
        file_id: &str,
        original_name: &str,
        asserted_sha256: Option<&str>,
    ) -> Result<FileRecord, FilesError> {
        let mut record = self.get_record(file_id).await?;

        let head = self.backend.head(Bucket::Eln, &record.storage_key).await;
        let Ok(metadata) = head else {
            return Err(FilesError::UploadIncomplete);
        };
        if metadata.size == 0 {
            return Err(FilesError::UploadIncomplete);
        }

        let object = self.backend.get(Bucket::Eln, &record.storage_key).await?;
        let sha256 = sha256_hex(&object.bytes);

        if !is_accepted(&object.bytes, &record.media_type, &self.config.allowed_media_types) {
            self.backend.delete(Bucket::Eln, &record.storage_key).await.ok();
            return Err(FilesError::MediaTypeRejected(record.media_type));
        }
        if asserted_sha256.is_some_and(|asserted| asserted != sha256) {
            warn!(file_id, "checksum mismatch on presigned finalize");
            self.backend.delete(Bucket::Eln, &record.storage_key).await.ok();
            return Err(FilesError::ChecksumMismatch);
        }

        record.original_name = original_name.to_owned();
        record.size_bytes = object.bytes.len() as u64;
        record.sha256 = sha256;
        record.created_at = Utc::now();
        self.write_record(&record).await?;
        Ok(record)
    }

    /// Fetch a file's record by its `file_id`.
    ///
    /// # Errors
    /// Returns [`FilesError::NotFound`] if no record exists for that id.
    pub async fn get_record(&self, file_id: &str) -> Result<FileRecord, FilesError> {
        let object = self.backend.get(Bucket::Eln, &record_key(file_id)).await?;
        let record: FileRecord = serde_json::from_slice(&object.bytes)
            .map_err(|e| FilesError::Internal(anyhow::anyhow!(e)))?;
        Ok(record)
    }

    /// Mark a file as bound to a submission, exempting it from the orphan
    /// sweep. Called by the submission store at finalize time.
    ///
    /// # Errors
    /// Returns [`FilesError::NotFound`] if no record exists for that id.
    pub async fn mark_bound(&self, file_id: &str) -> Result<(), FilesError> {
        let mut record = self.get_record(file_id).await?;
        record.bound = true;
        self.write_record(&record).await
    }

    /// Delete unbound files older than the configured sweep threshold.
    /// Idempotent — safe to call repeatedly on a timer. Returns the number
    /// of records removed.
    ///
    /// # Errors
    /// Returns [`FilesError::Internal`] if listing the backend fails.
    pub async fn sweep_orphans(&self) -> Result<usize, FilesError> {
        let threshold = Utc::now()
            - chrono::Duration::seconds(i64::try_from(self.config.orphan_sweep_after_seconds).unwrap_or(i64::MAX));
        let mut removed = 0usize;
        let mut cursor = None;
        loop {
            let page = self
                .backend
                .list(Bucket::Eln, "file-records/", cursor.as_deref(), 1000)
                .await
                .map_err(|e| FilesError::Internal(anyhow::anyhow!(e)))?;
            for entry in &page.entries {
                let Ok(object) = self.backend.get(Bucket::Eln, &entry.key).await else {
                    continue;
                };
                let Ok(record): Result<FileRecord, _> = serde_json::from_slice(&object.bytes) else {
                    continue;
                };
                if record.bound || record.created_at > threshold {
                    continue;
                }
                self.backend.delete(Bucket::Eln, &record.storage_key).await.ok();
                self.backend.delete(Bucket::Eln, &entry.key).await.ok();
                removed += 1;
            }
            cursor = page.next_cursor;
            if cursor.is_none() {
                break;
            }
        }
        debug!(removed, "orphan sweep complete");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claire_core::FilesConfig;
    use claire_storage::LocalFsBackend;

    fn backend() -> (tempfile::TempDir, Arc<dyn StorageBackend>) {
        let dir = tempfile::tempdir().unwrap();
        let backend: Arc<dyn StorageBackend> = Arc::new(LocalFsBackend::new(
            dir.path(),
            "acme",
            "http://localhost",
            b"s".to_vec(),
        ));
        (dir, backend)
    }

    #[tokio::test]
    async fn test_should_accept_inline_upload_and_compute_sha256() {
        let (_dir, backend) = backend();
        let store = FileStore::new(backend, FilesConfig::default());
        let bytes = Bytes::from_static(b"\x89PNG\r\n\x1a\nrest-of-file");
        let record = store
            .upload_inline("alice", None, "pixel.png", "image/png", bytes.clone())
            .await
            .unwrap();
        assert_eq!(record.size_bytes, bytes.len() as u64);
        assert_eq!(record.sha256, sha256_hex(&bytes));
        assert!(!record.bound);
    }

    #[tokio::test]
    async fn test_should_reject_oversize_inline_upload() {
        let (_dir, backend) = backend();
        let mut config = FilesConfig::default();
        config.max_size_bytes_inline = 4;
        let store = FileStore::new(backend, config);
        let err = store
            .upload_inline(
                "alice",
                None,
                "big.bin",
                "text/plain",
                Bytes::from_static(b"too big"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FilesError::TooLarge));
    }

    #[tokio::test]
    async fn test_should_reject_signature_mismatched_media_type() {
        let (_dir, backend) = backend();
        let store = FileStore::new(backend, FilesConfig::default());
        let err = store
            .upload_inline(
                "alice",
                None,
                "fake.png",
                "image/png",
                Bytes::from_static(b"%PDF-1.4"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FilesError::MediaTypeRejected(_)));
    }

    #[tokio::test]
    async fn test_should_finalize_presigned_upload_and_detect_checksum_mismatch() {
        let (_dir, backend) = backend();
        let store = FileStore::new(Arc::clone(&backend), FilesConfig::default());
        let reservation = store
            .presign_upload("alice", Some("SOP001"), "application/pdf", 4, 3600)
            .await
            .unwrap();

        // Simulate the client's direct PUT to the reserved key.
        let record = store.get_record(&reservation.file_id).await.unwrap();
        backend
            .put(
                Bucket::Eln,
                &record.storage_key,
                Bytes::from_static(b"%PDF-x"),
                "application/pdf",
            )
            .await
            .unwrap();

        let wrong_hash = "0".repeat(64);
        let err = store
            .finalize_presigned(&reservation.file_id, "doc.pdf", Some(&wrong_hash))
            .await
            .unwrap_err();
        assert!(matches!(err, FilesError::ChecksumMismatch));

        // The mismatched object was deleted; finalize again fails as incomplete.
        let err2 = store
            .finalize_presigned(&reservation.file_id, "doc.pdf", None)
            .await
            .unwrap_err();
        assert!(matches!(err2, FilesError::UploadIncomplete));
    }

    #[tokio::test]
    async fn test_should_finalize_presigned_upload_successfully() {
        let (_dir, backend) = backend();
        let store = FileStore::new(Arc::clone(&backend), FilesConfig::default());
        let reservation = store
            .presign_upload("alice", None, "application/pdf", 8, 3600)
            .await
            .unwrap();
        let record = store.get_record(&reservation.file_id).await.unwrap();
        let bytes = Bytes::from_static(b"%PDF-1.7 body");
        backend
            .put(Bucket::Eln, &record.storage_key, bytes.clone(), "application/pdf")
            .await
            .unwrap();

        let finalized = store
            .finalize_presigned(&reservation.file_id, "doc.pdf", Some(&sha256_hex(&bytes)))
            .await
            .unwrap();
        assert_eq!(finalized.sha256, sha256_hex(&bytes));
        assert_eq!(finalized.size_bytes, bytes.len() as u64);
    }

    #[tokio::test]
    async fn test_should_exempt_bound_files_from_orphan_sweep() {
        let (_dir, backend) = backend();
        let mut config = FilesConfig::default();
        config.orphan_sweep_after_seconds = 0;
        let store = FileStore::new(backend, config);
        let record = store
            .upload_inline("alice", None, "note.txt", "text/plain", Bytes::from_static(b"hello"))
            .await
            .unwrap();
        store.mark_bound(&record.file_id).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        let removed = store.sweep_orphans().await.unwrap();
        assert_eq!(removed, 0);
        assert!(store.get_record(&record.file_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_should_sweep_unbound_orphans_past_threshold() {
        let (_dir, backend) = backend();
        let mut config = FilesConfig::default();
        config.orphan_sweep_after_seconds = 0;
        let store = FileStore::new(backend, config);
        let record = store
            .upload_inline("alice", None, "note.txt", "text/plain", Bytes::from_static(b"hello"))
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        let removed = store.sweep_orphans().await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.get_record(&record.file_id).await.is_err());
    }
}
