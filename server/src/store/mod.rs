//! Credential and score persistence.
//!
//! The store is reached through a fixed-size [`Pool`] of connections. Each
//! connection implements [`CredentialStore`]; callers acquire a
//! [`PooledConnection`] guard per request and the guard hands the connection
//! back when it is dropped, on every exit path.
//!
//! # Backends
//!
//! - [`MemoryStore`]: in-process tables behind a single lock. Default backend.
//! - `PgStore` (feature `postgres`): PostgreSQL through `tokio-postgres`.
//!
//! # Invariants
//!
//! - `upsert_score` is atomic: concurrent submissions for the same user commute,
//!   so the stored `best_score` is the maximum of every applied score.
//! - `register_user` either writes the user, its API key and a zero score
//!   record together, or writes nothing.

mod memory;
mod pool;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::MemoryStore;
pub use pool::{Pool, PooledConnection};
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::types::{KeyOwner, Location, ScoreRecord, User, UserId};

/// Error returned by store operations.
#[derive(Debug)]
pub enum StoreError {
    /// The username is already taken.
    DuplicateUsername,
    /// The pool has been closed and no longer hands out connections.
    PoolClosed,
    /// A lock protecting shared state was poisoned by a panicking holder.
    LockPoisoned,
    /// The backend reported an error.
    Backend(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateUsername => write!(f, "username already exists"),
            Self::PoolClosed => write!(f, "connection pool is closed"),
            Self::LockPoisoned => write!(f, "store lock poisoned"),
            Self::Backend(message) => write!(f, "backend error: {message}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// A newly registered user and its API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub user_id: UserId,
    pub api_key: String,
}

/// One connection to the credential store.
///
/// Methods take `&mut self` because a connection serves one request at a time.
#[async_trait]
pub trait CredentialStore: Send {
    /// Look up a user by username.
    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>, StoreError>;

    /// Resolve an API key to its owner.
    async fn find_key_owner(&mut self, api_key: &str) -> Result<Option<KeyOwner>, StoreError>;

    /// Look up the API key issued to a user, if any.
    async fn find_api_key(&mut self, user_id: UserId) -> Result<Option<String>, StoreError>;

    /// Create a user, its API key and a zero score record in one step.
    ///
    /// # Errors
    /// Returns `StoreError::DuplicateUsername` without writing anything if the
    /// username is taken.
    async fn register_user(
        &mut self,
        username: &str,
        password_digest: &str,
        api_key: &str,
    ) -> Result<Registration, StoreError>;

    /// Atomically apply a score: `best = max(best, score)`, `last = score`,
    /// inserting the record if absent. Returns the resulting record.
    async fn upsert_score(&mut self, user_id: UserId, score: i64)
    -> Result<ScoreRecord, StoreError>;

    /// Read a user's score record.
    async fn find_score(&mut self, user_id: UserId) -> Result<Option<ScoreRecord>, StoreError>;

    /// Pick a random catalogue location, optionally restricted to one country.
    async fn random_location(&mut self, country: Option<&str>)
    -> Result<Option<Location>, StoreError>;

    /// Distinct countries in the catalogue, sorted.
    async fn countries(&mut self) -> Result<Vec<String>, StoreError>;

    /// Distinct destination types in the catalogue, sorted.
    async fn destination_types(&mut self) -> Result<Vec<String>, StoreError>;
}
