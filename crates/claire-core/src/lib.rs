//! Shared types, configuration, and error handling for CLAIRE services.
//!
//! This crate has no knowledge of HTTP, storage, or authentication — it is
//! the one dependency every other `claire-*` crate takes, so it stays small
//! and stable.

mod config;
mod error;
mod types;

pub use config::{
    AuthConfig, AuthProviderKind, BucketsConfig, ClaireConfig, ConfigLoader, DraftsConfig,
    FilesConfig, GroupConfig, StorageBackendKind, StorageConfig,
};
pub use error::{ClaireError, ClaireResult};
pub use types::{Environment, OrgId, Principal, ValidationIssue};
