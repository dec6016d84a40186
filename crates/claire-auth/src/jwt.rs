//! Self-hosted JWT provider: HMAC or RSA signature verification against a
//! configured secret/key, plus password-grant `authenticate`/`refresh`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use claire_core::{Environment, GroupConfig};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::claims::{CommonClaims, header_declares_dev_mode, resolve_principal};
use crate::credentials::CredentialStore;
use crate::error::AuthError;
use crate::provider::{AuthProvider, Session};

/// Clock skew tolerated on `exp`/`nbf`, matching the managed provider's
/// tolerance so the two providers behave consistently to callers.
const CLOCK_SKEW_SECONDS: u64 = 60;

/// Default session lifetime for tokens minted by `authenticate`/`refresh`.
const ACCESS_TOKEN_TTL_SECONDS: i64 = 3600;

fn parse_algorithm(name: &str) -> Result<Algorithm, AuthError> {
    match name {
        "HS256" => Ok(Algorithm::HS256),
        "RS256" => Ok(Algorithm::RS256),
        other => Err(AuthError::Invalid(format!(
            "unsupported signing algorithm: {other}"
        ))),
    }
}

/// Verifies and issues self-hosted JWTs.
#[derive(Debug)]
pub struct JwtProvider {
    algorithm: Algorithm,
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    issuer: String,
    audience: String,
    environment: Environment,
    groups: HashMap<String, GroupConfig>,
    credentials: Arc<dyn CredentialStore>,
}

impl JwtProvider {
    /// Construct a provider from resolved configuration.
    ///
    /// `secret` is an HMAC secret for `HS256` or PEM-encoded key material for
    /// `RS256` (the same PEM is used for both signing and verification,
    /// which assumes a deployment willing to hold the private key in the
    /// serving process; split keys are future work).
    ///
    /// # Errors
    /// Returns [`AuthError::Invalid`] if `algorithm` is not recognized or the
    /// key material fails to parse.
    pub fn new(
        secret: &str,
        algorithm: &str,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        environment: Environment,
        groups: HashMap<String, GroupConfig>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, AuthError> {
        let algorithm = parse_algorithm(algorithm)?;
        let (decoding_key, encoding_key) = match algorithm {
            Algorithm::HS256 => (
                DecodingKey::from_secret(secret.as_bytes()),
                EncodingKey::from_secret(secret.as_bytes()),
            ),
            Algorithm::RS256 => (
                DecodingKey::from_rsa_pem(secret.as_bytes())
                    .map_err(|e| AuthError::Invalid(format!("invalid RSA key: {e}")))?,
                EncodingKey::from_rsa_pem(secret.as_bytes())
                    .map_err(|e| AuthError::Invalid(format!("invalid RSA key: {e}")))?,
            ),
            _ => unreachable!("parse_algorithm only returns HS256 or RS256"),
        };

        Ok(Self {
            algorithm,
            decoding_key,
            encoding_key,
            issuer: issuer.into(),
            audience: audience.into(),
            environment,
            groups,
            credentials,
        })
    }

    fn mint(&self, claims: &CommonClaims) -> Result<String, AuthError> {
        let header = Header::new(self.algorithm);
        encode(&header, claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(anyhow::anyhow!(e)))
    }

    fn session_for(&self, subject: &str, username: &str, email: Option<String>, groups: Vec<String>) -> Result<Session, AuthError> {
        let now = chrono::Utc::now().timestamp();
        let claims = CommonClaims {
            sub: subject.to_owned(),
            username: username.to_owned(),
            email,
            groups,
            exp: now + ACCESS_TOKEN_TTL_SECONDS,
            nbf: Some(now),
            iss: Some(self.issuer.clone()),
            aud: Some(self.audience.clone()),
        };
        let principal = resolve_principal(&claims, &self.groups);
        let token = self.mint(&claims)?;
        let refresh_token = Uuid::new_v4().to_string();
        Ok(Session {
            token,
            refresh_token,
            principal,
        })
    }
}

#[async_trait]
impl AuthProvider for JwtProvider {
    async fn verify(&self, token: &str) -> Result<claire_core::Principal, AuthError> {
        if self.environment.requires_managed_auth() && header_declares_dev_mode(token)? {
            return Err(AuthError::Invalid(
                "dev-mode tokens are rejected in this environment".to_owned(),
            ));
        }

        let mut validation = Validation::new(self.algorithm);
        validation.set_issuer(&[self.issuer.clone()]);
        validation.set_audience(&[self.audience.clone()]);
        validation.leeway = CLOCK_SKEW_SECONDS;
        validation.required_spec_claims = HashSet::from(["exp".to_owned(), "sub".to_owned()]);

        let data = decode::<CommonClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid(e.to_string()),
            }
        })?;

        Ok(resolve_principal(&data.claims, &self.groups))
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let user = self.credentials.verify_password(username, password)?;
        self.session_for(&user.subject, &user.username, user.email, user.groups)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let user = self.credentials.resolve_refresh_token(refresh_token)?;
        self.session_for(&user.subject, &user.username, user.email, user.groups)
    }
}
