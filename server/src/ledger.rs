//! Score ledger.
//!
//! Applies score submissions to a user's record. The read-modify-write is
//! delegated to the store's single atomic upsert, never split into a read and
//! a later write, so concurrent submissions for the same user cannot lose a
//! higher best score.
//!
//! # Invariants
//!
//! - After any set of submissions `s1..sn`, `best_score = max(s1..sn)`
//!   (or the previous best if higher).
//! - `last_score` is the score of the submission applied last.
//! - Negative scores are rejected before the store is touched.

use crate::store::{Pool, StoreError};
use crate::types::{ScoreRecord, UserId};

/// Error returned by ledger operations.
#[derive(Debug)]
pub enum LedgerError {
    /// The submitted score is below zero.
    NegativeScore(i64),
    /// The store failed.
    Store(StoreError),
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegativeScore(score) => write!(f, "score must be non-negative, got {score}"),
            Self::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for LedgerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::NegativeScore(_) => None,
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

/// Score operations over a connection pool.
pub struct ScoreLedger<'a> {
    pool: &'a Pool,
}

impl<'a> ScoreLedger<'a> {
    #[must_use]
    pub const fn new(pool: &'a Pool) -> Self {
        Self { pool }
    }

    /// Apply `score` to the user's record and return the resulting record.
    pub async fn submit(&self, user_id: UserId, score: i64) -> Result<ScoreRecord, LedgerError> {
        if score < 0 {
            return Err(LedgerError::NegativeScore(score));
        }
        let mut connection = self.pool.acquire().await?;
        Ok(connection.upsert_score(user_id, score).await?)
    }

    /// Read the user's record, if one exists.
    pub async fn get_scores(&self, user_id: UserId) -> Result<Option<ScoreRecord>, LedgerError> {
        let mut connection = self.pool.acquire().await?;
        Ok(connection.find_score(user_id).await?)
    }
}
