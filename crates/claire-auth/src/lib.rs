//! Token verification and principal resolution for CLAIRE.
//!
//! Two [`AuthProvider`] implementations share one interface: [`CognitoProvider`]
//! for managed identity pools, [`JwtProvider`] for self-hosted deployments.
//! Neither crate above this one should match on which provider is in use.

mod claims;
mod cognito;
mod credentials;
mod error;
mod jwt;
mod provider;

pub use claims::{CommonClaims, header_declares_dev_mode, resolve_principal};
pub use cognito::CognitoProvider;
pub use credentials::{CredentialStore, StaticCredentialStore, UserRecord};
pub use error::AuthError;
pub use jwt::JwtProvider;
pub use provider::{AuthProvider, Session};
