//! Per-owner draft autosave state for CLAIRE.
//!
//! A draft is a partial, unvalidated form submission visible only to the
//! principal who created it. Drafts are never validated against their SOP
//! and never transition into a submission automatically — a client must
//! explicitly submit, at which point `claire-submissions` reads the draft's
//! body as a starting point and the draft is retired on success.

mod error;
mod model;
mod store;

pub use error::DraftError;
pub use model::{Draft, checksum_of};
pub use store::DraftStore;
