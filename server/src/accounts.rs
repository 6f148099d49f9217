//! Registration and login.
//!
//! # Pre-conditions
//! - Passwords are hashed before they reach the store; the plaintext is never
//!   written anywhere.
//!
//! # Post-conditions
//! - A successful registration has written the user, one API key and a zero
//!   score record. A failed one has written nothing.
//! - A successful login returns a freshly signed session token. Nothing is
//!   recorded server-side.
//!
//! # Invariants
//! - Login failures for an unknown username and a wrong password are the same
//!   error.

use tokio::task;

use crate::auth::{PasswordError, PasswordHasher, TokenError, TokenIssuer};
use crate::store::{Pool, Registration, StoreError};
use crate::types::{ScoreRecord, UserId};

/// Shortest accepted username.
pub const MIN_USERNAME_LEN: usize = 3;
/// Longest accepted username.
pub const MAX_USERNAME_LEN: usize = 32;
/// Longest accepted password, in bytes.
pub const MAX_PASSWORD_LEN: usize = 128;
/// Random bytes behind an API key (hex-encoded to twice as many characters).
pub const API_KEY_BYTES: usize = 32;

/// Error returned by account operations.
#[derive(Debug)]
pub enum AccountError {
    /// The input failed validation.
    Validation(String),
    /// The username is taken.
    DuplicateUsername,
    /// Unknown username or wrong password.
    InvalidCredentials,
    Store(StoreError),
    Password(PasswordError),
    Token(TokenError),
    /// A blocking hashing task did not complete.
    Task(String),
}

impl std::fmt::Display for AccountError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "{message}"),
            Self::DuplicateUsername => write!(f, "username already exists"),
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::Store(e) => write!(f, "store error: {e}"),
            Self::Password(e) => write!(f, "{e}"),
            Self::Token(e) => write!(f, "token error: {e}"),
            Self::Task(reason) => write!(f, "hashing task failed: {reason}"),
        }
    }
}

impl std::error::Error for AccountError {}

impl From<StoreError> for AccountError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateUsername => Self::DuplicateUsername,
            other => Self::Store(other),
        }
    }
}

impl From<PasswordError> for AccountError {
    fn from(e: PasswordError) -> Self {
        Self::Password(e)
    }
}

impl From<TokenError> for AccountError {
    fn from(e: TokenError) -> Self {
        Self::Token(e)
    }
}

impl From<task::JoinError> for AccountError {
    fn from(e: task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub token: String,
    /// The user's API key; `None` if the user never received one.
    pub api_key: Option<String>,
    pub user_id: UserId,
    pub scores: ScoreRecord,
}

/// Account operations over shared server resources.
pub struct Accounts<'a> {
    pool: &'a Pool,
    hasher: &'a PasswordHasher,
    tokens: &'a TokenIssuer,
}

impl<'a> Accounts<'a> {
    #[must_use]
    pub const fn new(pool: &'a Pool, hasher: &'a PasswordHasher, tokens: &'a TokenIssuer) -> Self {
        Self {
            pool,
            hasher,
            tokens,
        }
    }

    /// Register a new user and issue its API key.
    ///
    /// # Errors
    /// `Validation` for a malformed username or password, `DuplicateUsername`
    /// if the name is taken.
    pub async fn register(&self, username: &str, password: &str) -> Result<Registration, AccountError> {
        validate_username(username)?;
        validate_password(password)?;

        let hasher = self.hasher.clone();
        let plaintext = password.to_string();
        let digest = task::spawn_blocking(move || hasher.hash(&plaintext)).await??;
        let api_key = generate_api_key();

        let mut connection = self.pool.acquire().await?;
        let registration = connection.register_user(username, &digest, &api_key).await?;
        tracing::info!(user_id = %registration.user_id, "registered user {username}");
        Ok(registration)
    }

    /// Check a username and password and mint a session token.
    ///
    /// # Errors
    /// `Validation` if either field is empty, `InvalidCredentials` if the user
    /// is unknown or the password does not match.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AccountError> {
        if username.is_empty() || password.is_empty() {
            return Err(AccountError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        let user = {
            let mut connection = self.pool.acquire().await?;
            connection.find_user_by_username(username).await?
        };
        let Some(user) = user else {
            tracing::debug!("login rejected: unknown user");
            return Err(AccountError::InvalidCredentials);
        };

        let hasher = self.hasher.clone();
        let plaintext = password.to_string();
        let digest = user.password_digest.clone();
        let matches = task::spawn_blocking(move || hasher.verify(&plaintext, &digest)).await?;
        if !matches {
            tracing::debug!(user_id = %user.id, "login rejected: password mismatch");
            return Err(AccountError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id, &user.username)?;

        let mut connection = self.pool.acquire().await?;
        let api_key = connection.find_api_key(user.id).await?;
        let scores = connection.find_score(user.id).await?.unwrap_or_default();
        tracing::info!(user_id = %user.id, "user logged in");

        Ok(LoginOutcome {
            token,
            api_key,
            user_id: user.id,
            scores,
        })
    }
}

/// A fresh high-entropy API key, hex-encoded.
#[must_use]
pub fn generate_api_key() -> String {
    use rand::Rng;

    let mut bytes = [0u8; API_KEY_BYTES];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

fn validate_username(username: &str) -> Result<(), AccountError> {
    let length = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&length) {
        return Err(AccountError::Validation(format!(
            "Username must be between {MIN_USERNAME_LEN} and {MAX_USERNAME_LEN} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(AccountError::Validation(
            "Username may only contain letters, digits, '_', '.' and '-'".to_string(),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AccountError> {
    if password.is_empty() || password.len() > MAX_PASSWORD_LEN {
        return Err(AccountError::Validation(format!(
            "Password must be between 1 and {MAX_PASSWORD_LEN} bytes"
        )));
    }
    Ok(())
}
