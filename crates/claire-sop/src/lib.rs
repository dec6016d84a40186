//! SOP document model, YAML loading, and field validation for CLAIRE.
//!
//! [`SopRegistry`] is a read-through cache over a [`claire_storage::StorageBackend`];
//! [`validate`] is pure and takes a document and a submitted body.

mod document;
mod error;
mod registry;
mod validate;

pub use document::{
    CrossFieldRule, Field, FieldType, FilenameComponent, SopDocument, SopMetadata, SopStatus,
    Task, TaskGroup,
};
pub use error::SopError;
pub use registry::SopRegistry;
pub use validate::{AttachmentInfo, validate};
