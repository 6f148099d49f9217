//! Shared test fixtures.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::auth::{PasswordHasher, TokenIssuer};
use crate::config::ServerConfig;
use crate::gate::GateConfig;
use crate::http::AppState;
use crate::store::MemoryStore;
use crate::time::TimeSource;
use crate::types::Location;

/// Signing secret used by test states.
pub const TEST_SECRET: &[u8] = b"scorekeeper-test-secret";

/// Cookie domain used by test states.
pub const TEST_COOKIE_DOMAIN: &str = ".game.example";

/// Origin allow-listed by [`test_config`].
pub const ALLOWED_ORIGIN: &str = "https://game.example";

/// Roughly November 2023, in seconds.
pub const DEFAULT_START_SECS: u64 = 1_700_000_000;

/// A simulated time source for deterministic testing.
///
/// Time only moves when told to. Backed by an atomic so it can be shared with
/// a token issuer running on a multi-threaded runtime.
#[derive(Debug)]
pub struct SimulatedTimeSource {
    current_secs: AtomicU64,
}

impl SimulatedTimeSource {
    #[must_use]
    pub const fn new(initial_secs: u64) -> Self {
        Self {
            current_secs: AtomicU64::new(initial_secs),
        }
    }

    /// Advance time by the given number of seconds, saturating at `u64::MAX`.
    pub fn advance(&self, secs: u64) {
        let _ = self
            .current_secs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_add(secs))
            });
    }

    /// Set the current time. Can move time backwards.
    pub fn set(&self, secs: u64) {
        self.current_secs.store(secs, Ordering::SeqCst);
    }
}

impl TimeSource for SimulatedTimeSource {
    fn now_secs(&self) -> u64 {
        self.current_secs.load(Ordering::SeqCst)
    }
}

/// Configuration for tests: one allow-listed origin, testing tool disabled.
#[must_use]
pub fn test_config() -> ServerConfig {
    ServerConfig {
        gate: GateConfig {
            allowed_origins: vec![ALLOWED_ORIGIN.to_string()],
            public_api: false,
            testing_tool_allowed: false,
        },
        jwt_secret: TEST_SECRET.to_vec(),
        token_validity: crate::auth::DEFAULT_VALIDITY,
        cookie_domain: TEST_COOKIE_DOMAIN.to_string(),
        listen_port: ServerConfig::DEFAULT_PORT,
        pool_size: 4,
        database_url: None,
        locations_file: None,
    }
}

/// A handful of catalogue rows.
#[must_use]
pub fn sample_locations() -> Vec<Location> {
    vec![
        Location {
            latitude: 48.8584,
            longitude: 2.2945,
            country: "France".to_string(),
            destination_type: "city".to_string(),
        },
        Location {
            latitude: 45.8326,
            longitude: 6.8652,
            country: "France".to_string(),
            destination_type: "mountain".to_string(),
        },
        Location {
            latitude: 35.6586,
            longitude: 139.7454,
            country: "Japan".to_string(),
            destination_type: "city".to_string(),
        },
    ]
}

/// Everything a test needs to drive and inspect a server state.
pub struct TestState {
    pub state: AppState,
    pub store: MemoryStore,
    pub time: Arc<SimulatedTimeSource>,
}

/// Build an [`AppState`] over an in-memory store with cheap Argon2 parameters
/// and a simulated clock.
#[must_use]
#[allow(clippy::expect_used, clippy::disallowed_methods)]
pub fn test_state(config: ServerConfig, locations: Vec<Location>) -> TestState {
    let store = MemoryStore::with_locations(locations);
    let pool = store.pool(config.pool_size);
    let time = Arc::new(SimulatedTimeSource::new(DEFAULT_START_SECS));
    let tokens = TokenIssuer::with_time_source(
        &config.jwt_secret,
        config.token_validity,
        Arc::clone(&time) as Arc<dyn TimeSource>,
    )
    .expect("valid token settings");
    let hasher = PasswordHasher::with_params(8, 1, 1).expect("valid argon2 params");

    TestState {
        state: AppState::new(config, pool, hasher, tokens),
        store,
        time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_time_moves_only_when_told() {
        let time = SimulatedTimeSource::new(1000);
        assert_eq!(time.now_secs(), 1000);

        time.advance(100);
        assert_eq!(time.now_secs(), 1100);

        time.set(5000);
        assert_eq!(time.now_secs(), 5000);

        time.advance(u64::MAX);
        assert_eq!(time.now_secs(), u64::MAX);
    }
}
