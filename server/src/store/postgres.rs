//! PostgreSQL credential store.
//!
//! One `PgStore` wraps one `tokio_postgres::Client`; a pool is built from
//! several of them with [`PgStore::pool`]. A store whose connection has
//! closed reconnects before its next statement.

use async_trait::async_trait;
use tokio_postgres::{Client, NoTls};

use super::{CredentialStore, Pool, Registration, StoreError};
use crate::types::{KeyOwner, Location, ScoreRecord, User, UserId};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id              BIGSERIAL PRIMARY KEY,
    username        VARCHAR(32) UNIQUE NOT NULL,
    password_digest TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS api_keys (
    api_key         VARCHAR(64) PRIMARY KEY,
    user_id         BIGINT NOT NULL REFERENCES users(id)
);
CREATE INDEX IF NOT EXISTS idx_api_keys_user ON api_keys (user_id);
CREATE TABLE IF NOT EXISTS user_points (
    user_id         BIGINT PRIMARY KEY REFERENCES users(id),
    best_score      BIGINT NOT NULL DEFAULT 0 CHECK (best_score >= 0),
    last_score      BIGINT NOT NULL DEFAULT 0 CHECK (last_score >= 0)
);
CREATE TABLE IF NOT EXISTS locations (
    id              BIGSERIAL PRIMARY KEY,
    lat             DOUBLE PRECISION NOT NULL,
    lng             DOUBLE PRECISION NOT NULL,
    country         TEXT NOT NULL,
    dest_type       TEXT NOT NULL
);
";

// Single statement: concurrent submissions for the same user commute.
const UPSERT_SCORE: &str = "
INSERT INTO user_points (user_id, best_score, last_score) VALUES ($1, $2, $2)
ON CONFLICT (user_id) DO UPDATE SET
    best_score = GREATEST(user_points.best_score, EXCLUDED.best_score),
    last_score = EXCLUDED.last_score
RETURNING best_score, last_score
";

fn backend(error: &tokio_postgres::Error) -> StoreError {
    StoreError::Backend(error.to_string())
}

async fn open(url: &str) -> Result<Client, StoreError> {
    let (client, connection) = tokio_postgres::connect(url, NoTls)
        .await
        .map_err(|e| backend(&e))?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("postgres connection error: {e}");
        }
    });
    Ok(client)
}

/// A single PostgreSQL connection.
pub struct PgStore {
    url: String,
    client: Client,
}

impl PgStore {
    /// Connect to `url` and make sure the schema exists.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = open(url).await?;
        client.batch_execute(SCHEMA).await.map_err(|e| backend(&e))?;
        Ok(Self {
            url: url.to_string(),
            client,
        })
    }

    /// The live client, reconnecting first if the connection has closed.
    async fn client(&mut self) -> Result<&mut Client, StoreError> {
        if self.client.is_closed() {
            tracing::warn!("postgres connection closed, reconnecting");
            self.client = open(&self.url).await?;
        }
        Ok(&mut self.client)
    }

    /// Open `size` connections to `url` and pool them.
    pub async fn pool(url: &str, size: usize) -> Result<Pool, StoreError> {
        let mut connections: Vec<Box<dyn CredentialStore>> = Vec::with_capacity(size);
        for _ in 0..size {
            connections.push(Box::new(Self::connect(url).await?));
        }
        Ok(Pool::new(connections))
    }

    async fn distinct(&mut self, query: &str) -> Result<Vec<String>, StoreError> {
        let rows = self
            .client()
            .await?
            .query(query, &[])
            .await
            .map_err(|e| backend(&e))?;
        Ok(rows.iter().map(|row| row.get::<_, String>(0)).collect())
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>, StoreError> {
        let row = self
            .client()
            .await?
            .query_opt(
                "SELECT id, username, password_digest FROM users WHERE username = $1",
                &[&username],
            )
            .await
            .map_err(|e| backend(&e))?;
        Ok(row.map(|row| User {
            id: UserId(row.get(0)),
            username: row.get(1),
            password_digest: row.get(2),
        }))
    }

    async fn find_key_owner(&mut self, api_key: &str) -> Result<Option<KeyOwner>, StoreError> {
        let row = self
            .client()
            .await?
            .query_opt(
                "SELECT u.id, u.username FROM api_keys k JOIN users u ON u.id = k.user_id \
                 WHERE k.api_key = $1",
                &[&api_key],
            )
            .await
            .map_err(|e| backend(&e))?;
        Ok(row.map(|row| KeyOwner {
            user_id: UserId(row.get(0)),
            username: row.get(1),
        }))
    }

    async fn find_api_key(&mut self, user_id: UserId) -> Result<Option<String>, StoreError> {
        let row = self
            .client()
            .await?
            .query_opt(
                "SELECT api_key FROM api_keys WHERE user_id = $1 LIMIT 1",
                &[&user_id.0],
            )
            .await
            .map_err(|e| backend(&e))?;
        Ok(row.map(|row| row.get(0)))
    }

    async fn register_user(
        &mut self,
        username: &str,
        password_digest: &str,
        api_key: &str,
    ) -> Result<Registration, StoreError> {
        let transaction = self
            .client()
            .await?
            .transaction()
            .await
            .map_err(|e| backend(&e))?;

        let inserted = transaction
            .query_opt(
                "INSERT INTO users (username, password_digest) VALUES ($1, $2) \
                 ON CONFLICT (username) DO NOTHING RETURNING id",
                &[&username, &password_digest],
            )
            .await
            .map_err(|e| backend(&e))?;
        // Dropping the transaction rolls it back.
        let Some(row) = inserted else {
            return Err(StoreError::DuplicateUsername);
        };
        let user_id = UserId(row.get(0));

        transaction
            .execute(
                "INSERT INTO api_keys (api_key, user_id) VALUES ($1, $2)",
                &[&api_key, &user_id.0],
            )
            .await
            .map_err(|e| backend(&e))?;
        transaction
            .execute(
                "INSERT INTO user_points (user_id, best_score, last_score) VALUES ($1, 0, 0) \
                 ON CONFLICT (user_id) DO NOTHING",
                &[&user_id.0],
            )
            .await
            .map_err(|e| backend(&e))?;
        transaction.commit().await.map_err(|e| backend(&e))?;

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
        let row = self
            .client()
            .await?
            .query_one(UPSERT_SCORE, &[&user_id.0, &score])
            .await
            .map_err(|e| backend(&e))?;
        Ok(ScoreRecord {
            best_score: row.get(0),
            last_score: row.get(1),
        })
    }

    async fn find_score(&mut self, user_id: UserId) -> Result<Option<ScoreRecord>, StoreError> {
        let row = self
            .client()
            .await?
            .query_opt(
                "SELECT best_score, last_score FROM user_points WHERE user_id = $1",
                &[&user_id.0],
            )
            .await
            .map_err(|e| backend(&e))?;
        Ok(row.map(|row| ScoreRecord {
            best_score: row.get(0),
            last_score: row.get(1),
        }))
    }

    async fn random_location(
        &mut self,
        country: Option<&str>,
    ) -> Result<Option<Location>, StoreError> {
        let row = self
            .client()
            .await?
            .query_opt(
                "SELECT lat, lng, country, dest_type FROM locations \
                 WHERE $1::TEXT IS NULL OR lower(country) = lower($1::TEXT) \
                 ORDER BY random() LIMIT 1",
                &[&country],
            )
            .await
            .map_err(|e| backend(&e))?;
        Ok(row.map(|row| Location {
            latitude: row.get(0),
            longitude: row.get(1),
            country: row.get(2),
            destination_type: row.get(3),
        }))
    }

    async fn countries(&mut self) -> Result<Vec<String>, StoreError> {
        self.distinct("SELECT DISTINCT country FROM locations ORDER BY country")
            .await
    }

    async fn destination_types(&mut self) -> Result<Vec<String>, StoreError> {
        self.distinct("SELECT DISTINCT dest_type FROM locations ORDER BY dest_type")
            .await
    }
}
