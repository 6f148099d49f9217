//! In-memory credential store.
//!
//! All clones of a `MemoryStore` share the same tables, so each clone acts as
//! one pool connection. Every operation runs inside a single critical section,
//! which makes multi-row writes (registration) and read-modify-write updates
//! (score upsert) atomic.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rand::seq::IndexedRandom;

use super::{CredentialStore, Pool, Registration, StoreError};
use crate::types::{KeyOwner, Location, ScoreRecord, User, UserId};

#[derive(Debug, Default)]
struct Tables {
    next_user_id: i64,
    users: HashMap<UserId, User>,
    usernames: HashMap<String, UserId>,
    api_keys: HashMap<String, UserId>,
    keys_by_user: HashMap<UserId, String>,
    scores: HashMap<UserId, ScoreRecord>,
    locations: Vec<Location>,
}

/// Shared in-memory tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose location catalogue is seeded with `locations`.
    #[must_use]
    pub fn with_locations(locations: Vec<Location>) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables {
                locations,
                ..Tables::default()
            })),
        }
    }

    /// Build a pool of `size` connections over these tables.
    #[must_use]
    pub fn pool(&self, size: usize) -> Pool {
        let connections = (0..size)
            .map(|_| Box::new(self.clone()) as Box<dyn CredentialStore>)
            .collect();
        Pool::new(connections)
    }

    /// Number of registered users.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.tables.lock().map_or(0, |tables| tables.users.len())
    }

    /// Number of issued API keys.
    #[must_use]
    pub fn api_key_count(&self) -> usize {
        self.tables.lock().map_or(0, |tables| tables.api_keys.len())
    }

    /// Number of score records.
    #[must_use]
    pub fn score_count(&self) -> usize {
        self.tables.lock().map_or(0, |tables| tables.scores.len())
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .usernames
            .get(username)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn find_key_owner(&mut self, api_key: &str) -> Result<Option<KeyOwner>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .api_keys
            .get(api_key)
            .and_then(|id| tables.users.get(id))
            .map(|user| KeyOwner {
                user_id: user.id,
                username: user.username.clone(),
            }))
    }

    async fn find_api_key(&mut self, user_id: UserId) -> Result<Option<String>, StoreError> {
        Ok(self.tables()?.keys_by_user.get(&user_id).cloned())
    }

    async fn register_user(
        &mut self,
        username: &str,
        password_digest: &str,
        api_key: &str,
    ) -> Result<Registration, StoreError> {
        let mut tables = self.tables()?;
        if tables.usernames.contains_key(username) {
            return Err(StoreError::DuplicateUsername);
        }
        if tables.api_keys.contains_key(api_key) {
            return Err(StoreError::Backend("api key collision".to_string()));
        }

        tables.next_user_id += 1;
        let user_id = UserId(tables.next_user_id);
        tables.users.insert(
            user_id,
            User {
                id: user_id,
                username: username.to_string(),
                password_digest: password_digest.to_string(),
            },
        );
        tables.usernames.insert(username.to_string(), user_id);
        tables.api_keys.insert(api_key.to_string(), user_id);
        tables.keys_by_user.insert(user_id, api_key.to_string());
        tables.scores.insert(user_id, ScoreRecord::ZERO);

        Ok(Registration {
            user_id,
            api_key: api_key.to_string(),
        })
    }

    async fn upsert_score(
        &mut self,
        user_id: UserId,
        score: i64,
    ) -> Result<ScoreRecord, StoreError> {
        let mut tables = self.tables()?;
        let record = tables.scores.entry(user_id).or_insert(ScoreRecord::ZERO);
        *record = record.apply(score);
        Ok(*record)
    }

    async fn find_score(&mut self, user_id: UserId) -> Result<Option<ScoreRecord>, StoreError> {
        Ok(self.tables()?.scores.get(&user_id).copied())
    }

    async fn random_location(
        &mut self,
        country: Option<&str>,
    ) -> Result<Option<Location>, StoreError> {
        let tables = self.tables()?;
        let candidates: Vec<&Location> = tables
            .locations
            .iter()
            .filter(|location| {
                country.is_none_or(|country| location.country.eq_ignore_ascii_case(country))
            })
            .collect();
        Ok(candidates
            .choose(&mut rand::rng())
            .map(|location| (*location).clone()))
    }

    async fn countries(&mut self) -> Result<Vec<String>, StoreError> {
        let tables = self.tables()?;
        let distinct: BTreeSet<&str> = tables
            .locations
            .iter()
            .map(|location| location.country.as_str())
            .collect();
        Ok(distinct.into_iter().map(str::to_string).collect())
    }

    async fn destination_types(&mut self) -> Result<Vec<String>, StoreError> {
        let tables = self.tables()?;
        let distinct: BTreeSet<&str> = tables
            .locations
            .iter()
            .map(|location| location.destination_type.as_str())
            .collect();
        Ok(distinct.into_iter().map(str::to_string).collect())
    }
}
