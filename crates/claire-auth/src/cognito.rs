//! Managed identity pool provider: RS256 verification against a JWKS
//! endpoint, with a `dashmap`-backed key cache keyed by `kid`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use claire_core::{GroupConfig, Principal};
use dashmap::DashMap;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use tracing::debug;

use crate::claims::{CommonClaims, resolve_principal};
use crate::error::AuthError;
use crate::provider::{AuthProvider, Session};

/// Clock skew tolerance for `exp`/`nbf` (§4.3).
const CLOCK_SKEW_SECONDS: u64 = 60;

/// How long a fetched JWKS key set is trusted before a re-fetch is forced.
const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, serde::Deserialize)]
struct Jwks {
    keys: Vec<JwksKey>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct JwksKey {
    kid: String,
    n: String,
    e: String,
}

/// Verifies Cognito-issued RS256 tokens against the pool's published JWKS.
///
/// `authenticate`/`refresh` are not implemented here — Cognito login is a
/// client-side hosted-UI flow outside this crate's scope — and always
/// return [`AuthError::NotSupported`].
#[derive(Debug)]
pub struct CognitoProvider {
    jwks_url: String,
    issuer: String,
    client_id: String,
    groups: HashMap<String, GroupConfig>,
    http: reqwest::Client,
    keys: DashMap<String, JwksKey>,
    keys_fetched_at: DashMap<(), Instant>,
}

impl CognitoProvider {
    /// Construct a provider for the given user pool.
    #[must_use]
    pub fn new(
        region: &str,
        pool_id: &str,
        client_id: impl Into<String>,
        groups: HashMap<String, GroupConfig>,
    ) -> Self {
        let issuer = format!("https://cognito-idp.{region}.amazonaws.com/{pool_id}");
        let jwks_url = format!("{issuer}/.well-known/jwks.json");
        Self {
            jwks_url,
            issuer,
            client_id: client_id.into(),
            groups,
            http: reqwest::Client::new(),
            keys: DashMap::new(),
            keys_fetched_at: DashMap::new(),
        }
    }

    fn cache_is_fresh(&self) -> bool {
        self.keys_fetched_at
            .get(&())
            .is_some_and(|fetched| fetched.elapsed() < JWKS_CACHE_TTL)
    }

    async fn refresh_jwks(&self) -> Result<(), AuthError> {
        debug!(url = %self.jwks_url, "fetching JWKS");
        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::KeySourceUnavailable(e.to_string()))?;
        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| AuthError::KeySourceUnavailable(e.to_string()))?;
        self.keys.clear();
        for key in jwks.keys {
            self.keys.insert(key.kid.clone(), key);
        }
        self.keys_fetched_at.insert((), Instant::now());
        Ok(())
    }

    async fn decoding_key_for(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if !self.cache_is_fresh() || !self.keys.contains_key(kid) {
            self.refresh_jwks().await?;
        }
        let key = self
            .keys
            .get(kid)
            .ok_or_else(|| AuthError::UnknownKey(kid.to_owned()))?;
        DecodingKey::from_rsa_components(&key.n, &key.e)
            .map_err(|e| AuthError::Invalid(format!("malformed JWKS key: {e}")))
    }
}

#[async_trait]
impl AuthProvider for CognitoProvider {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::Invalid(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::Invalid("token header is missing kid".to_owned()))?;
        let decoding_key = self.decoding_key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[self.issuer.clone()]);
        validation.set_audience(&[self.client_id.clone()]);
        validation.leeway = CLOCK_SKEW_SECONDS;

        let data = decode::<CommonClaims>(token, &decoding_key, &validation).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid(e.to_string()),
            }
        })?;

        Ok(resolve_principal(&data.claims, &self.groups))
    }

    async fn authenticate(&self, _username: &str, _password: &str) -> Result<Session, AuthError> {
        Err(AuthError::NotSupported)
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<Session, AuthError> {
        Err(AuthError::NotSupported)
    }
}
