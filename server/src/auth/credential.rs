//! Credential classification and verification.
//!
//! A caller proves its identity with exactly one credential: an opaque API key
//! or a signed session token. Both arrive as `Authorization: Bearer <value>`
//! (the API key may also come in a JSON body); the value's shape decides which
//! kind it is, and each endpoint lists the kinds it accepts.

use axum::http::{HeaderMap, header};

use super::TokenIssuer;
use crate::store::{Pool, StoreError};
use crate::types::UserId;

/// The two kinds of credential a caller can present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    ApiKey,
    SessionToken,
}

/// A credential extracted from a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    ApiKey(String),
    SessionToken(String),
}

impl Credential {
    /// Classify a bearer value by shape.
    ///
    /// Three non-empty dot-separated segments is a session token (JWT compact
    /// form); anything else is treated as an API key.
    #[must_use]
    pub fn classify(bearer: &str) -> Self {
        let segments: Vec<&str> = bearer.split('.').collect();
        if segments.len() == 3 && segments.iter().all(|segment| !segment.is_empty()) {
            Self::SessionToken(bearer.to_string())
        } else {
            Self::ApiKey(bearer.to_string())
        }
    }

    /// Extract and classify the bearer credential from request headers.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        bearer_token(headers).map(Self::classify)
    }

    #[must_use]
    pub const fn kind(&self) -> CredentialKind {
        match self {
            Self::ApiKey(_) => CredentialKind::ApiKey,
            Self::SessionToken(_) => CredentialKind::SessionToken,
        }
    }
}

/// Extract a non-empty bearer token from the `Authorization` header.
///
/// The scheme name is matched case-insensitively.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim_start().split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
}

/// The verified caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub via: CredentialKind,
}

/// Error returned when a request cannot be authenticated.
#[derive(Debug)]
pub enum AuthError {
    /// No credential accompanied the request.
    MissingCredential,
    /// The credential is unknown, malformed, expired, or of a kind the
    /// endpoint does not accept.
    InvalidCredential,
    /// The key lookup failed.
    Store(StoreError),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCredential => write!(f, "missing credential"),
            Self::InvalidCredential => write!(f, "invalid credential"),
            Self::Store(e) => write!(f, "credential lookup failed: {e}"),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::MissingCredential | Self::InvalidCredential => None,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

/// Resolves credentials to identities.
///
/// API keys are looked up through the pool; session tokens are verified
/// against the token issuer without touching the store.
pub struct CredentialVerifier<'a> {
    pool: &'a Pool,
    tokens: &'a TokenIssuer,
}

impl<'a> CredentialVerifier<'a> {
    #[must_use]
    pub const fn new(pool: &'a Pool, tokens: &'a TokenIssuer) -> Self {
        Self { pool, tokens }
    }

    /// Verify `credential`, accepting only the listed kinds.
    pub async fn verify(
        &self,
        credential: &Credential,
        accepted: &[CredentialKind],
    ) -> Result<Identity, AuthError> {
        if !accepted.contains(&credential.kind()) {
            tracing::debug!("credential kind {:?} not accepted here", credential.kind());
            return Err(AuthError::InvalidCredential);
        }

        match credential {
            Credential::ApiKey(key) => self.verify_api_key(key).await,
            Credential::SessionToken(token) => self.verify_session_token(token),
        }
    }

    async fn verify_api_key(&self, key: &str) -> Result<Identity, AuthError> {
        let mut connection = self.pool.acquire().await?;
        let owner = connection
            .find_key_owner(key)
            .await?
            .ok_or(AuthError::InvalidCredential)?;
        Ok(Identity {
            user_id: owner.user_id,
            username: owner.username,
            via: CredentialKind::ApiKey,
        })
    }

    fn verify_session_token(&self, token: &str) -> Result<Identity, AuthError> {
        let assertion = self.tokens.verify(token).map_err(|e| {
            tracing::debug!("session token rejected: {e}");
            AuthError::InvalidCredential
        })?;
        Ok(Identity {
            user_id: assertion.user_id,
            username: assertion.username,
            via: CredentialKind::SessionToken,
        })
    }
}
