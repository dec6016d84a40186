//! The `Draft` model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A partial, unvalidated form submission owned exclusively by its creator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    /// The SOP this draft is being filled out against.
    pub sop_id: String,
    /// The SOP version pinned at creation time.
    pub sop_version: String,
    /// Opaque identifier, client-chosen or server-issued.
    pub draft_id: String,
    /// The principal id of the owner; only the owner (or an admin) may act on it.
    pub owner: String,
    /// Partial field assignment. Not validated against the SOP.
    pub body: serde_json::Value,
    /// Monotonic last-write timestamp.
    pub updated_at: DateTime<Utc>,
    /// `sha256` of the canonical JSON body, for optimistic-concurrency acknowledgments.
    pub checksum: String,
}

impl claire_rbac::DraftView for Draft {
    fn owner(&self) -> &str {
        &self.owner
    }
}

/// Compute the checksum stored alongside a draft body.
#[must_use]
pub fn checksum_of(body: &serde_json::Value) -> String {
    let canonical = serde_json::to_vec(body).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_should_compute_stable_checksum_for_identical_bodies() {
        let a = checksum_of(&json!({"x": 1, "y": 2}));
        let b = checksum_of(&json!({"x": 1, "y": 2}));
        assert_eq!(a, b);
    }

    #[test]
    fn test_should_compute_different_checksum_for_different_bodies() {
        let a = checksum_of(&json!({"x": 1}));
        let b = checksum_of(&json!({"x": 2}));
        assert_ne!(a, b);
    }
}
