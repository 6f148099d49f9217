//! Per-user score record.
//!
//! # Invariants
//!
//! - `best_score` never decreases across any sequence of submissions.
//! - `last_score` is always the most recently applied submission.
//! - Both fields are non-negative.

use serde::Serialize;

/// A user's best and most recent score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ScoreRecord {
    pub best_score: i64,
    pub last_score: i64,
}

impl ScoreRecord {
    /// The record a user starts with.
    pub const ZERO: Self = Self {
        best_score: 0,
        last_score: 0,
    };

    /// Apply a new score observation.
    ///
    /// Applying the same score twice yields the same record as applying it once.
    #[must_use]
    pub fn apply(self, score: i64) -> Self {
        Self {
            best_score: self.best_score.max(score),
            last_score: score,
        }
    }
}
