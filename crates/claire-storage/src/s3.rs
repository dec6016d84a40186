//! S3-backed [`StorageBackend`], using native AWS SDK presigning.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::Utc;

use crate::backend::StorageBackend;
use crate::error::StorageError;
use crate::types::{Bucket, ListEntry, ListPage, ObjectMetadata, StoredObject};

/// S3-backed storage. One bucket name is configured per logical
/// [`Bucket`]; object keys are additionally prefixed by `{organization}/`.
#[derive(Debug, Clone)]
pub struct S3Backend {
    client: Client,
    organization: String,
    bucket_forms: String,
    bucket_drafts: String,
    bucket_eln: String,
    bucket_lambda: String,
}

impl S3Backend {
    /// Construct a backend from an already-configured SDK client and the
    /// four logical bucket names.
    #[must_use]
    pub fn new(
        client: Client,
        organization: impl Into<String>,
        bucket_forms: impl Into<String>,
        bucket_drafts: impl Into<String>,
        bucket_eln: impl Into<String>,
        bucket_lambda: impl Into<String>,
    ) -> Self {
        Self {
            client,
            organization: organization.into(),
            bucket_forms: bucket_forms.into(),
            bucket_drafts: bucket_drafts.into(),
            bucket_eln: bucket_eln.into(),
            bucket_lambda: bucket_lambda.into(),
        }
    }

    fn bucket_name(&self, bucket: Bucket) -> &str {
        match bucket {
            Bucket::Forms => &self.bucket_forms,
            Bucket::Drafts => &self.bucket_drafts,
            Bucket::Eln => &self.bucket_eln,
            Bucket::Lambda => &self.bucket_lambda,
        }
    }

    fn object_key(&self, key: &str) -> String {
        format!("{}/{key}", self.organization)
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    async fn put(
        &self,
        bucket: Bucket,
        key: &str,
        bytes: Bytes,
        media_type: &str,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(self.bucket_name(bucket))
            .key(self.object_key(key))
            .content_type(media_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, bucket: Bucket, key: &str) -> Result<StoredObject, StorageError> {
        let response = self
            .client
            .get_object()
            .bucket(self.bucket_name(bucket))
            .key(self.object_key(key))
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StorageError::NotFound(bucket.as_str().to_owned(), key.to_owned())
                } else {
                    StorageError::Unavailable(e.to_string())
                }
            })?;
        let media_type = response
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_owned();
        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Internal(anyhow::anyhow!(e)))?
            .into_bytes();
        Ok(StoredObject { bytes, media_type })
    }

    async fn head(&self, bucket: Bucket, key: &str) -> Result<ObjectMetadata, StorageError> {
        let response = self
            .client
            .head_object()
            .bucket(self.bucket_name(bucket))
            .key(self.object_key(key))
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    StorageError::NotFound(bucket.as_str().to_owned(), key.to_owned())
                } else {
                    StorageError::Unavailable(e.to_string())
                }
            })?;
        let last_modified = response
            .last_modified()
            .and_then(|t| chrono::DateTime::from_timestamp(t.secs(), 0))
            .unwrap_or_else(Utc::now);
        Ok(ObjectMetadata {
            size: u64::try_from(response.content_length().unwrap_or_default()).unwrap_or_default(),
            media_type: response
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_owned(),
            last_modified,
        })
    }

    async fn list(
        &self,
        bucket: Bucket,
        prefix: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<ListPage, StorageError> {
        let full_prefix = self.object_key(prefix);
        let mut request = self
            .client
            .list_objects_v2()
            .bucket(self.bucket_name(bucket))
            .prefix(&full_prefix)
            .max_keys(i32::try_from(limit).unwrap_or(i32::MAX));
        if let Some(cursor) = cursor {
            request = request.continuation_token(cursor);
        }
        let response = request
            .send()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        let org_prefix = format!("{}/", self.organization);
        let entries = response
            .contents()
            .iter()
            .map(|object| ListEntry {
                key: object
                    .key()
                    .unwrap_or_default()
                    .strip_prefix(&org_prefix)
                    .unwrap_or_default()
                    .to_owned(),
                size: u64::try_from(object.size().unwrap_or_default()).unwrap_or_default(),
                last_modified: object
                    .last_modified()
                    .and_then(|t| chrono::DateTime::from_timestamp(t.secs(), 0))
                    .unwrap_or_else(Utc::now),
            })
            .collect();

        Ok(ListPage {
            entries,
            next_cursor: response.next_continuation_token().map(ToOwned::to_owned),
        })
    }

    async fn delete(&self, bucket: Bucket, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(self.bucket_name(bucket))
            .key(self.object_key(key))
            .send()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn presign_put(
        &self,
        bucket: Bucket,
        key: &str,
        ttl_seconds: u64,
        media_type: &str,
    ) -> Result<String, StorageError> {
        let config = PresigningConfig::expires_in(Duration::from_secs(ttl_seconds))
            .map_err(|e| StorageError::Internal(anyhow::anyhow!(e)))?;
        let presigned = self
            .client
            .put_object()
            .bucket(self.bucket_name(bucket))
            .key(self.object_key(key))
            .content_type(media_type)
            .presigned(config)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(presigned.uri().to_owned())
    }

    async fn presign_get(
        &self,
        bucket: Bucket,
        key: &str,
        ttl_seconds: u64,
    ) -> Result<String, StorageError> {
        let config = PresigningConfig::expires_in(Duration::from_secs(ttl_seconds))
            .map_err(|e| StorageError::Internal(anyhow::anyhow!(e)))?;
        let presigned = self
            .client
            .get_object()
            .bucket(self.bucket_name(bucket))
            .key(self.object_key(key))
            .presigned(config)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(presigned.uri().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_prefix_object_key_with_organization() {
        let backend = S3Backend::new(
            Client::new(&aws_config::SdkConfig::builder().build()),
            "acme",
            "forms",
            "drafts",
            "eln",
            "lambda",
        );
        assert_eq!(backend.object_key("sops/a.yaml"), "acme/sops/a.yaml");
    }

    #[test]
    fn test_should_select_bucket_name_by_logical_bucket() {
        let backend = S3Backend::new(
            Client::new(&aws_config::SdkConfig::builder().build()),
            "acme",
            "forms-bucket",
            "drafts-bucket",
            "eln-bucket",
            "lambda-bucket",
        );
        assert_eq!(backend.bucket_name(Bucket::Eln), "eln-bucket");
        assert_eq!(backend.bucket_name(Bucket::Forms), "forms-bucket");
    }
}
