//! Configuration management for CLAIRE services.
//!
//! A single [`ClaireConfig`] document is resolved once per process (§4.1) and
//! then frozen — components receive an `Arc<ClaireConfig>` at construction,
//! never a global. [`ConfigLoader::resolve`] implements the precedence chain:
//! a remote document fetched by the caller (typically via `claire-storage`),
//! then a local file, then built-in defaults with a warning.

use std::collections::HashMap;
use std::path::Path;

use tracing::warn;
use typed_builder::TypedBuilder;

use crate::error::ClaireError;
use crate::types::Environment;

/// Identity provider selection (§4.1 `auth.provider`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProviderKind {
    /// Externally hosted identity pool (e.g. Cognito).
    Cognito,
    /// Self-hosted signed-token provider.
    Jwt,
}

/// One group's description and granted permission strings.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GroupConfig {
    /// Human-readable description of the group's purpose.
    #[serde(default)]
    pub description: String,
    /// Permission strings granted to members of this group.
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Authentication configuration (§4.1 `auth.*`).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct AuthConfig {
    /// Which provider implementation to construct.
    pub provider: Option<AuthProviderKind>,
    /// Managed pool id (Cognito user pool id).
    pub pool_id: Option<String>,
    /// Managed pool client id.
    pub client_id: Option<String>,
    /// Managed pool region.
    pub region: Option<String>,
    /// Self-hosted signing secret (HMAC) or PEM key material (RSA).
    pub secret: Option<String>,
    /// Self-hosted signing algorithm, e.g. `HS256`, `RS256`.
    pub algorithm: Option<String>,
    /// Expected `iss` claim.
    pub issuer: Option<String>,
    /// Expected `aud` claim.
    pub audience: Option<String>,
    /// Group name to description/permissions mapping.
    #[serde(default)]
    pub groups: HashMap<String, GroupConfig>,
}

/// Storage backend selection (§4.1 `storage.*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    /// Local filesystem, for development.
    Local,
    /// Object storage (S3), for production.
    Object,
}

/// The four logical buckets every deployment provisions.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BucketsConfig {
    /// SOP documents, owned by the forms namespace.
    pub forms: String,
    /// Draft autosave state.
    pub drafts: String,
    /// Finalized submissions.
    pub eln: String,
    /// Lambda-adjacent scratch space (outside this spec's scope beyond naming).
    pub lambda: String,
}

impl Default for BucketsConfig {
    fn default() -> Self {
        Self {
            forms: "forms".to_owned(),
            drafts: "drafts".to_owned(),
            eln: "eln".to_owned(),
            lambda: "lambda".to_owned(),
        }
    }
}

/// Storage configuration (§4.1 `storage.*`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StorageConfig {
    /// Which backend implementation to construct.
    pub backend: StorageBackendKind,
    /// Logical bucket names within the backend.
    #[serde(default)]
    pub buckets: BucketsConfig,
    /// Root directory for the local backend (ignored by the object backend).
    #[serde(default = "default_local_root")]
    pub local_root: String,
}

fn default_local_root() -> String {
    "/var/lib/claire/data".to_owned()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::Local,
            buckets: BucketsConfig::default(),
            local_root: default_local_root(),
        }
    }
}

/// File upload configuration (§4.1 `files.*`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FilesConfig {
    /// Maximum size, in bytes, accepted for any single file.
    pub max_size_bytes: u64,
    /// Maximum size accepted for the inline (request-body) upload path.
    pub max_size_bytes_inline: u64,
    /// Allowed media types, checked against both declared and sniffed type.
    pub allowed_media_types: Vec<String>,
    /// Part size used when a presigned upload is chunked by the client.
    pub upload_part_size: u64,
    /// Age (seconds) an unbound upload must reach before the sweep removes it.
    pub orphan_sweep_after_seconds: u64,
    /// Cadence, in seconds, of the background orphan-sweep routine.
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

fn default_sweep_interval_seconds() -> u64 {
    60 * 60
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 100 * 1024 * 1024,
            max_size_bytes_inline: 6 * 1024 * 1024,
            allowed_media_types: vec![
                "image/png".to_owned(),
                "image/jpeg".to_owned(),
                "application/pdf".to_owned(),
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document".to_owned(),
                "text/csv".to_owned(),
                "text/plain".to_owned(),
            ],
            upload_part_size: 8 * 1024 * 1024,
            orphan_sweep_after_seconds: 24 * 60 * 60,
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

/// Draft store configuration (§4.1 `drafts.*`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DraftsConfig {
    /// Seconds a draft may go unmodified before it is considered expired.
    pub ttl_seconds: u64,
    /// Maximum number of live drafts a single owner may hold.
    pub max_per_user: usize,
}

impl Default for DraftsConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 7 * 24 * 60 * 60,
            max_per_user: 50,
        }
    }
}

/// The frozen, process-wide CLAIRE configuration document (§4.1).
#[derive(Debug, Clone, TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct ClaireConfig {
    /// Deployment environment; drives provider enforcement.
    #[builder(default = Environment::Dev)]
    pub environment: Environment,
    /// Organization namespace, required and non-empty.
    pub organization: String,
    /// Authentication configuration.
    #[builder(default)]
    pub auth: AuthConfig,
    /// Storage configuration.
    #[builder(default)]
    pub storage: StorageConfig,
    /// File upload configuration.
    #[builder(default)]
    pub files: FilesConfig,
    /// Draft store configuration.
    #[builder(default)]
    pub drafts: DraftsConfig,
}

impl Default for ClaireConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Dev,
            organization: String::new(),
            auth: AuthConfig::default(),
            storage: StorageConfig::default(),
            files: FilesConfig::default(),
            drafts: DraftsConfig::default(),
        }
    }
}

impl ClaireConfig {
    /// Validate the document against the constraints in §4.1.
    ///
    /// # Errors
    /// Returns [`ClaireError::ConfigInvalid`] if required keys are missing, or
    /// [`ClaireError::ConfigProviderMismatch`] if the environment/provider
    /// enforcement rule is violated.
    pub fn validate(&self, running_as_managed_function: bool) -> Result<(), ClaireError> {
        if self.organization.trim().is_empty() {
            return Err(ClaireError::ConfigInvalid(
                "organization must be non-empty".to_owned(),
            ));
        }

        match self.auth.provider {
            None => {
                return Err(ClaireError::ConfigInvalid(
                    "auth.provider must be set".to_owned(),
                ));
            }
            Some(AuthProviderKind::Cognito) => {
                if self.auth.pool_id.is_none() || self.auth.client_id.is_none() {
                    return Err(ClaireError::ConfigInvalid(
                        "auth.pool_id and auth.client_id are required for the cognito provider"
                            .to_owned(),
                    ));
                }
            }
            Some(AuthProviderKind::Jwt) => {
                if self.auth.secret.is_none() || self.auth.algorithm.is_none() {
                    return Err(ClaireError::ConfigInvalid(
                        "auth.secret and auth.algorithm are required for the jwt provider"
                            .to_owned(),
                    ));
                }
            }
        }

        if self.environment.requires_managed_auth()
            && running_as_managed_function
            && self.auth.provider != Some(AuthProviderKind::Cognito)
        {
            return Err(ClaireError::ConfigProviderMismatch(format!(
                "environment {} on a managed function requires the cognito provider",
                self.environment
            )));
        }

        Ok(())
    }
}

/// Resolves a single [`ClaireConfig`] per the §4.1 precedence chain.
#[derive(Debug, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolve the configuration document.
    ///
    /// `remote_json` is the caller-fetched bytes from the storage backend's
    /// well-known config key, if any. `file_path` is consulted next. If
    /// neither source produces a document, [`ClaireConfig::default`] is used
    /// and a warning is logged.
    ///
    /// # Errors
    /// Returns [`ClaireError::ConfigInvalid`] if a source parses but fails
    /// validation, or if the discovered document is malformed JSON/YAML.
    pub fn resolve(
        remote_json: Option<&[u8]>,
        file_path: Option<&Path>,
        running_as_managed_function: bool,
    ) -> Result<ClaireConfig, ClaireError> {
        let config = if let Some(bytes) = remote_json {
            serde_json::from_slice(bytes)
                .map_err(|e| ClaireError::ConfigInvalid(format!("remote config: {e}")))?
        } else if let Some(path) = file_path.filter(|p| p.exists()) {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ClaireError::ConfigInvalid(format!("config file: {e}")))?;
            serde_json::from_str(&text)
                .map_err(|e| ClaireError::ConfigInvalid(format!("config file: {e}")))?
        } else {
            warn!("no configuration source found, falling back to built-in defaults");
            ClaireConfig::default()
        };

        config.validate(running_as_managed_function)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ClaireConfig {
        ClaireConfig {
            organization: "acme".to_owned(),
            auth: AuthConfig {
                provider: Some(AuthProviderKind::Jwt),
                secret: Some("s".to_owned()),
                algorithm: Some("HS256".to_owned()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_should_reject_empty_organization() {
        let mut config = base_config();
        config.organization.clear();
        assert!(config.validate(false).is_err());
    }

    #[test]
    fn test_should_reject_missing_provider() {
        let mut config = base_config();
        config.auth.provider = None;
        assert!(config.validate(false).is_err());
    }

    #[test]
    fn test_should_reject_jwt_provider_on_managed_function_in_prod() {
        let mut config = base_config();
        config.environment = Environment::Prod;
        assert!(matches!(
            config.validate(true),
            Err(ClaireError::ConfigProviderMismatch(_))
        ));
    }

    #[test]
    fn test_should_allow_jwt_provider_in_prod_off_managed_function() {
        let mut config = base_config();
        config.environment = Environment::Prod;
        assert!(config.validate(false).is_ok());
    }

    #[test]
    fn test_should_allow_cognito_provider_on_managed_function_in_prod() {
        let mut config = base_config();
        config.environment = Environment::Prod;
        config.auth = AuthConfig {
            provider: Some(AuthProviderKind::Cognito),
            pool_id: Some("pool".to_owned()),
            client_id: Some("client".to_owned()),
            ..Default::default()
        };
        assert!(config.validate(true).is_ok());
    }

    #[test]
    fn test_should_resolve_from_remote_bytes() {
        let config = base_config();
        let json = serde_json::to_vec(&config).unwrap();
        let resolved = ConfigLoader::resolve(Some(&json), None, false).unwrap();
        assert_eq!(resolved.organization, "acme");
    }

    #[test]
    fn test_should_fall_back_to_defaults_when_invalid() {
        let resolved = ConfigLoader::resolve(None, None, false);
        assert!(resolved.is_err(), "defaults have no organization set");
    }
}
