//! `DraftStore`: backend-persisted drafts with an in-memory per-owner index
//! for ceiling enforcement and LRU eviction.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use claire_storage::{Bucket, StorageBackend};
use dashmap::DashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DraftError;
use crate::model::{Draft, checksum_of};

#[derive(Debug, Clone)]
struct IndexEntry {
    draft_id: String,
    sop_id: String,
    updated_at: DateTime<Utc>,
}

fn draft_key(sop_id: &str, owner: &str, draft_id: &str) -> String {
    format!("{sop_id}/{owner}/{draft_id}.json")
}

/// Owner-scoped draft autosave state, backed by a [`StorageBackend`].
///
/// The per-owner index is a performance/eviction cache over the backend,
/// not a second source of truth: it is rebuilt from a full backend listing
/// at construction, and every mutation keeps it consistent going forward.
#[derive(Debug)]
pub struct DraftStore {
    backend: Arc<dyn StorageBackend>,
    ttl: Duration,
    max_per_user: usize,
    index: DashMap<String, Vec<IndexEntry>>,
}

impl DraftStore {
    /// Build a store over `backend`, rebuilding the owner index from a full
    /// listing of the drafts bucket.
    ///
    /// # Errors
    /// Returns [`DraftError::Internal`] if the initial listing fails.
    pub async fn new(
        backend: Arc<dyn StorageBackend>,
        ttl_seconds: u64,
        max_per_user: usize,
    ) -> Result<Self, DraftError> {
        let store = Self {
            backend,
            ttl: Duration::from_secs(ttl_seconds),
            max_per_user,
            index: DashMap::new(),
        };
        store.rebuild_index().await?;
        Ok(store)
    }

    async fn rebuild_index(&self) -> Result<(), DraftError> {
        let page = self
            .backend
            .list(Bucket::Drafts, "", None, 10_000)
            .await
            .map_err(|e| DraftError::Internal(anyhow::anyhow!(e)))?;
        for entry in page.entries {
            let mut parts = entry.key.splitn(3, '/');
            let (Some(sop_id), Some(owner), Some(filename)) =
                (parts.next(), parts.next(), parts.next())
            else {
                continue;
            };
            let Some(draft_id) = filename.strip_suffix(".json") else {
                continue;
            };
            self.index.entry(owner.to_owned()).or_default().push(IndexEntry {
                draft_id: draft_id.to_owned(),
                sop_id: sop_id.to_owned(),
                updated_at: entry.last_modified,
            });
        }
        Ok(())
    }

    fn find_sop_id(&self, owner: &str, draft_id: &str) -> Option<String> {
        self.index
            .get(owner)?
            .iter()
            .find(|e| e.draft_id == draft_id)
            .map(|e| e.sop_id.clone())
    }

    async fn fetch(&self, sop_id: &str, owner: &str, draft_id: &str) -> Result<Draft, DraftError> {
        let object = self
            .backend
            .get(Bucket::Drafts, &draft_key(sop_id, owner, draft_id))
            .await?;
        let draft: Draft = serde_json::from_slice(&object.bytes)
            .map_err(|e| DraftError::Internal(anyhow::anyhow!(e)))?;
        Ok(draft)
    }

    async fn is_expired(&self, draft: &Draft) -> bool {
        Utc::now().signed_duration_since(draft.updated_at).num_seconds()
            > i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX)
    }

    async fn evict_oldest(&self, owner: &str) -> Result<(), DraftError> {
        let oldest = self
            .index
            .get(owner)
            .and_then(|entries| entries.iter().min_by_key(|e| e.updated_at).cloned());
        if let Some(oldest) = oldest {
            warn!(owner, draft_id = %oldest.draft_id, "evicting least-recently-updated draft at ceiling");
            self.backend
                .delete(Bucket::Drafts, &draft_key(&oldest.sop_id, owner, &oldest.draft_id))
                .await?;
            if let Some(mut entries) = self.index.get_mut(owner) {
                entries.retain(|e| e.draft_id != oldest.draft_id);
            }
        }
        Ok(())
    }

    /// Create a new draft, enforcing the per-owner ceiling with LRU eviction.
    ///
    /// # Errors
    /// Returns [`DraftError::Internal`] on a backend write failure.
    pub async fn create(
        &self,
        owner: &str,
        sop_id: &str,
        sop_version: &str,
        body: serde_json::Value,
    ) -> Result<String, DraftError> {
        if self
            .index
            .get(owner)
            .is_some_and(|entries| entries.len() >= self.max_per_user)
        {
            self.evict_oldest(owner).await?;
        }

        let draft_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let draft = Draft {
            sop_id: sop_id.to_owned(),
            sop_version: sop_version.to_owned(),
            draft_id: draft_id.clone(),
            owner: owner.to_owned(),
            checksum: checksum_of(&body),
            body,
            updated_at: now,
        };
        self.write_through(&draft).await?;
        self.index.entry(owner.to_owned()).or_default().push(IndexEntry {
            draft_id: draft_id.clone(),
            sop_id: sop_id.to_owned(),
            updated_at: now,
        });
        debug!(owner, draft_id, "created draft");
        Ok(draft_id)
    }

    async fn write_through(&self, draft: &Draft) -> Result<(), DraftError> {
        let bytes = serde_json::to_vec(draft).map_err(|e| DraftError::Internal(anyhow::anyhow!(e)))?;
        self.backend
            .put(
                Bucket::Drafts,
                &draft_key(&draft.sop_id, &draft.owner, &draft.draft_id),
                Bytes::from(bytes),
                "application/json",
            )
            .await?;
        Ok(())
    }

    /// Overwrite a draft's body. Last write wins; returns the new timestamp
    /// and checksum so clients can detect divergence from concurrent edits.
    ///
    /// # Errors
    /// Returns [`DraftError::NotFound`] if the draft does not exist.
    pub async fn update(
        &self,
        owner: &str,
        draft_id: &str,
        body: serde_json::Value,
    ) -> Result<(DateTime<Utc>, String), DraftError> {
        let sop_id = self
            .find_sop_id(owner, draft_id)
            .ok_or_else(|| DraftError::NotFound(draft_id.to_owned()))?;
        let mut draft = self.fetch(&sop_id, owner, draft_id).await?;
        draft.body = body;
        draft.checksum = checksum_of(&draft.body);
        draft.updated_at = Utc::now();
        self.write_through(&draft).await?;

        if let Some(mut entries) = self.index.get_mut(owner) {
            if let Some(entry) = entries.iter_mut().find(|e| e.draft_id == draft_id) {
                entry.updated_at = draft.updated_at;
            }
        }
        Ok((draft.updated_at, draft.checksum))
    }

    /// Fetch a draft, applying opportunistic TTL expiry.
    ///
    /// # Errors
    /// Returns [`DraftError::NotFound`] if the draft does not exist or has expired.
    pub async fn get(&self, owner: &str, draft_id: &str) -> Result<Draft, DraftError> {
        let sop_id = self
            .find_sop_id(owner, draft_id)
            .ok_or_else(|| DraftError::NotFound(draft_id.to_owned()))?;
        let draft = self.fetch(&sop_id, owner, draft_id).await?;
        if self.is_expired(&draft).await {
            self.delete(owner, draft_id).await?;
            return Err(DraftError::NotFound(draft_id.to_owned()));
        }
        Ok(draft)
    }

    /// List an owner's drafts, optionally filtered by `sop_id`, applying
    /// opportunistic TTL expiry along the way.
    ///
    /// # Errors
    /// Returns [`DraftError::Internal`] on an unexpected backend error.
    pub async fn list(
        &self,
        owner: &str,
        sop_id: Option<&str>,
    ) -> Result<Vec<Draft>, DraftError> {
        let entries: Vec<IndexEntry> = self
            .index
            .get(owner)
            .map(|e| e.clone())
            .unwrap_or_default();

        let mut drafts = Vec::new();
        for entry in entries {
            if sop_id.is_some_and(|filter| filter != entry.sop_id) {
                continue;
            }
            let Ok(draft) = self.fetch(&entry.sop_id, owner, &entry.draft_id).await else {
                continue;
            };
            if self.is_expired(&draft).await {
                let _ = self.delete(owner, &entry.draft_id).await;
                continue;
            }
            drafts.push(draft);
        }
        Ok(drafts)
    }

    /// Delete a draft. Idempotent.
    ///
    /// # Errors
    /// Returns [`DraftError::Internal`] on an unexpected backend error.
    pub async fn delete(&self, owner: &str, draft_id: &str) -> Result<(), DraftError> {
        if let Some(sop_id) = self.find_sop_id(owner, draft_id) {
            self.backend
                .delete(Bucket::Drafts, &draft_key(&sop_id, owner, draft_id))
                .await?;
        }
        if let Some(mut entries) = self.index.get_mut(owner) {
            entries.retain(|e| e.draft_id != draft_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn store(ttl_seconds: u64, max_per_user: usize) -> (tempfile::TempDir, DraftStore) {
        let dir = tempfile::tempdir().unwrap();
        let backend: Arc<dyn StorageBackend> = Arc::new(claire_storage::LocalFsBackend::new(
            dir.path(),
            "acme",
            "http://localhost",
            b"s".to_vec(),
        ));
        let store = DraftStore::new(backend, ttl_seconds, max_per_user).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_should_create_get_and_delete_draft() {
        let (_dir, store) = store(3600, 10).await;
        let draft_id = store
            .create("alice", "SOP001", "1.0.0", json!({"a": 1}))
            .await
            .unwrap();
        let draft = store.get("alice", &draft_id).await.unwrap();
        assert_eq!(draft.body, json!({"a": 1}));
        store.delete("alice", &draft_id).await.unwrap();
        assert!(store.get("alice", &draft_id).await.is_err());
    }

    #[tokio::test]
    async fn test_update_is_last_write_wins_and_returns_new_checksum() {
        let (_dir, store) = store(3600, 10).await;
        let draft_id = store
            .create("alice", "SOP001", "1.0.0", json!({"a": 1}))
            .await
            .unwrap();
        let (_, checksum1) = store.update("alice", &draft_id, json!({"a": 1})).await.unwrap();
        let (_, checksum2) = store.update("alice", &draft_id, json!({"a": 2})).await.unwrap();
        assert_ne!(checksum1, checksum2);
        let draft = store.get("alice", &draft_id).await.unwrap();
        assert_eq!(draft.body, json!({"a": 2}));
    }

    #[tokio::test]
    async fn test_should_enforce_ceiling_with_lru_eviction() {
        let (_dir, store) = store(3600, 2).await;
        let first = store
            .create("alice", "SOP001", "1.0.0", json!({"n": 1}))
            .await
            .unwrap();
        store
            .create("alice", "SOP001", "1.0.0", json!({"n": 2}))
            .await
            .unwrap();
        store
            .create("alice", "SOP001", "1.0.0", json!({"n": 3}))
            .await
            .unwrap();
        // the oldest draft should have been evicted to make room
        assert!(store.get("alice", &first).await.is_err());
        assert_eq!(store.list("alice", None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_should_filter_list_by_sop_id() {
        let (_dir, store) = store(3600, 10).await;
        store
            .create("alice", "SOP001", "1.0.0", json!({}))
            .await
            .unwrap();
        store
            .create("alice", "SOP002", "1.0.0", json!({}))
            .await
            .unwrap();
        let filtered = store.list("alice", Some("SOP001")).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].sop_id, "SOP001");
    }

    #[tokio::test]
    async fn test_should_expire_draft_past_ttl() {
        let (_dir, store) = store(0, 10).await;
        let draft_id = store
            .create("alice", "SOP001", "1.0.0", json!({}))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        assert!(store.get("alice", &draft_id).await.is_err());
    }

    #[tokio::test]
    async fn test_should_not_validate_draft_body() {
        let (_dir, store) = store(3600, 10).await;
        // Any shape is accepted; drafts are not validated against the SOP.
        let draft_id = store
            .create("alice", "SOP001", "1.0.0", json!("not even an object"))
            .await
            .unwrap();
        assert!(store.get("alice", &draft_id).await.is_ok());
    }
}
