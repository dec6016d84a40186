//! Finalization of SOP submissions for CLAIRE.
//!
//! The object key a finalized submission is stored under is the system's
//! primary index: it encodes the SOP, the submitter, the SOP's declared
//! filename components, a timestamp, and a random nonce, so the underlying
//! object store's key namespace alone is enough to browse submissions by
//! SOP without a separate index. Finalization is otherwise append-only —
//! there is no mutation path for a submission once materialized.

mod error;
mod keygen;
mod model;
mod store;

pub use error::SubmissionsError;
pub use keygen::{compose_object_key, format_timestamp, normalize_component};
pub use model::{AttachmentSnapshot, IdempotencyRecord, PrincipalSnapshot, Submission};
pub use store::{FinalizeRequest, SubmissionStore};
