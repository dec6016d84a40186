//! Common types shared across CLAIRE services: organization identity, the
//! authenticated principal, and validation reporting.

use std::fmt;

/// The organization namespace a process instance serves.
///
/// One process instance serves exactly one organization (§9, cross-org
/// isolation is a future extension); every storage key is prefixed with it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct OrgId(String);

impl OrgId {
    /// Create an organization id from a non-empty string.
    ///
    /// # Errors
    /// Returns [`crate::ClaireError::ConfigInvalid`] if `id` is empty.
    pub fn new(id: impl Into<String>) -> Result<Self, crate::ClaireError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(crate::ClaireError::ConfigInvalid(
                "organization must be non-empty".to_owned(),
            ));
        }
        Ok(Self(id))
    }

    /// Borrow the organization id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deployment environment, drives provider enforcement (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development.
    Dev,
    /// Automated test runs.
    Test,
    /// Staging.
    Stage,
    /// Production.
    Prod,
}

impl Environment {
    /// Whether this environment requires a managed identity pool (`environment
    /// ∈ {stage, prod}` per §4.1).
    #[must_use]
    pub fn requires_managed_auth(self) -> bool {
        matches!(self, Self::Stage | Self::Prod)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Dev => "dev",
            Self::Test => "test",
            Self::Stage => "stage",
            Self::Prod => "prod",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Environment {
    type Err = crate::ClaireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "test" => Ok(Self::Test),
            "stage" => Ok(Self::Stage),
            "prod" => Ok(Self::Prod),
            other => Err(crate::ClaireError::ConfigInvalid(format!(
                "unknown environment: {other}"
            ))),
        }
    }
}

/// An authenticated caller, reconstructed per request from a verified token.
///
/// Not persisted by the core (§3); `permissions` is derived from `groups` via
/// the RBAC group-to-permission mapping in configuration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Principal {
    /// Stable subject identifier from the identity provider.
    pub subject: String,
    /// Display username.
    pub username: String,
    /// Email address, if the provider supplied one.
    pub email: Option<String>,
    /// Ordered group memberships, as asserted by the identity provider.
    pub groups: Vec<String>,
    /// Permission strings derived from `groups` via configuration.
    pub permissions: Vec<String>,
    /// Whether this principal holds the reserved `*` admin permission.
    pub is_admin: bool,
}

impl Principal {
    /// Whether the principal shares at least one group with `other_groups`.
    #[must_use]
    pub fn shares_group(&self, other_groups: &[String]) -> bool {
        self.groups.iter().any(|g| other_groups.contains(g))
    }
}

/// One field-level validation failure, as produced by `claire-sop`'s validator
/// and reported in a `ValidationFailed` envelope's `error.details`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidationIssue {
    /// Dotted path to the offending field.
    pub path: String,
    /// One of the §4.5 validation codes.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl ValidationIssue {
    /// Construct a new validation issue.
    pub fn new(path: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}
