//! Signed session assertions.
//!
//! Mints and verifies HS256 JSON Web Tokens carrying a user's identity.
//!
//! # Pre-conditions
//! - The signing secret must be non-empty.
//! - The validity window must be at least one second.
//!
//! # Post-conditions
//! - `verify` succeeds only for tokens signed with the same secret whose
//!   `exp` is strictly after the current time.
//!
//! # Invariants
//! - Verification is stateless and does not touch the store.
//! - No server-side session is recorded; there is no revocation.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::time::{SystemTimeSource, TimeSource};
use crate::types::UserId;

/// Default validity window of a session assertion.
pub const DEFAULT_VALIDITY: Duration = Duration::from_secs(2 * 60 * 60);

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    /// Subject: the decimal user id.
    sub: String,
    /// Username at the time of issuance.
    usr: String,
    iat: u64,
    exp: u64,
}

/// A verified identity assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAssertion {
    pub user_id: UserId,
    pub username: String,
    pub issued_at: u64,
    pub expires_at: u64,
}

/// Error returned when the issuer cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenConfigError {
    /// The signing secret is empty.
    EmptySecret,
    /// The validity window is shorter than one second.
    ZeroValidity,
}

impl std::fmt::Display for TokenConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySecret => write!(f, "token signing secret must not be empty"),
            Self::ZeroValidity => write!(f, "token validity must be at least one second"),
        }
    }
}

impl std::error::Error for TokenConfigError {}

/// Error returned when issuing or verifying a token fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The token signature is invalid.
    InvalidSignature,
    /// The token has expired.
    TokenExpired,
    /// The token is malformed or its claims cannot be parsed.
    MalformedToken,
    /// The 'sub' claim is missing or empty.
    MissingSubClaim,
    /// Signing a new token failed.
    Signing(String),
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSignature => write!(f, "invalid token signature"),
            Self::TokenExpired => write!(f, "token has expired"),
            Self::MalformedToken => write!(f, "malformed token"),
            Self::MissingSubClaim => write!(f, "missing 'sub' claim in token"),
            Self::Signing(reason) => write!(f, "token signing failed: {reason}"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Mints and verifies session tokens with a process-wide secret.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    validity: Duration,
    time: Arc<dyn TimeSource>,
}

impl TokenIssuer {
    /// Create an issuer reading the system clock.
    ///
    /// # Errors
    /// Returns `TokenConfigError` if the secret is empty or the validity
    /// window is below one second.
    pub fn new(secret: &[u8], validity: Duration) -> Result<Self, TokenConfigError> {
        Self::with_time_source(secret, validity, Arc::new(SystemTimeSource))
    }

    /// Create an issuer reading the given time source.
    pub fn with_time_source(
        secret: &[u8],
        validity: Duration,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self, TokenConfigError> {
        if secret.is_empty() {
            return Err(TokenConfigError::EmptySecret);
        }
        if validity.as_secs() == 0 {
            return Err(TokenConfigError::ZeroValidity);
        }

        // Expiry is checked against our own time source in `verify`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            validity,
            time,
        })
    }

    /// The validity window of issued tokens.
    #[must_use]
    pub const fn validity(&self) -> Duration {
        self.validity
    }

    /// Mint a token for `user_id` valid from now.
    pub fn issue(&self, user_id: UserId, username: &str) -> Result<String, TokenError> {
        self.issue_at(user_id, username, self.time.now_secs())
    }

    /// Mint a token as if issued at `issued_at` (seconds since the epoch).
    pub fn issue_at(
        &self,
        user_id: UserId,
        username: &str,
        issued_at: u64,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user_id.to_string(),
            usr: username.to_string(),
            iat: issued_at,
            exp: issued_at.saturating_add(self.validity.as_secs()),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify a token's signature and expiry.
    ///
    /// # Errors
    /// Returns `TokenError` describing why the token was rejected.
    pub fn verify(&self, token: &str) -> Result<SessionAssertion, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(map_jwt_error)?
            .claims;

        if claims.sub.is_empty() {
            return Err(TokenError::MissingSubClaim);
        }
        let user_id = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| TokenError::MalformedToken)?;

        if self.time.now_secs() >= claims.exp {
            return Err(TokenError::TokenExpired);
        }

        Ok(SessionAssertion {
            user_id,
            username: claims.usr,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }
}

/// Maps jsonwebtoken errors to our `TokenError` type.
fn map_jwt_error(error: jsonwebtoken::errors::Error) -> TokenError {
    use jsonwebtoken::errors::ErrorKind;

    match error.kind() {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::ExpiredSignature => TokenError::TokenExpired,
        ErrorKind::MissingRequiredClaim(claim) if claim == "sub" => TokenError::MissingSubClaim,
        _ => TokenError::MalformedToken,
    }
}
