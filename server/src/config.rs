//! Server configuration module.
//!
//! This module provides configuration loading for the Scorekeeper server from
//! environment variables.
//!
//! # Environment Variables
//!
//! - `SCOREKEEPER_JWT_SECRET`: Secret used to sign session tokens (required)
//! - `SCOREKEEPER_COOKIE_DOMAIN`: `Domain` attribute of the session cookie (required)
//! - `SCOREKEEPER_ALLOWED_ORIGINS`: Comma-separated origin allow-list (default: empty)
//! - `SCOREKEEPER_PUBLIC_API`: Admit every origin, without credentials (default: `false`)
//! - `SCOREKEEPER_TESTING_TOOL_ALLOWED`: Admit the API testing tool (default: `false`)
//! - `SCOREKEEPER_TOKEN_VALIDITY_SECS`: Session token lifetime (default: `7200`)
//! - `SCOREKEEPER_LISTEN_PORT`: Port to listen on (default: `3000`)
//! - `SCOREKEEPER_POOL_SIZE`: Number of store connections (default: `8`)
//! - `SCOREKEEPER_DATABASE_URL`: PostgreSQL URL; unset selects the in-memory store
//! - `SCOREKEEPER_LOCATIONS_FILE`: JSON file seeding the in-memory location catalogue
//!
//! # Invariants
//!
//! - `jwt_secret` and `cookie_domain` are never empty
//! - `token_validity` is at least one second
//! - `pool_size` is within `1..=MAX_POOL_SIZE`

use std::path::PathBuf;
use std::time::Duration;

use crate::gate::GateConfig;

/// Upper bound on the connection pool size.
pub const MAX_POOL_SIZE: usize = 64;

/// Server configuration.
///
/// Loaded once at startup and shared read-only by every request.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Admission gate settings.
    pub gate: GateConfig,
    /// HS256 signing secret for session tokens.
    pub jwt_secret: Vec<u8>,
    /// Lifetime of a session token; also the cookie `Max-Age`.
    pub token_validity: Duration,
    /// Domain the session cookie is scoped to.
    pub cookie_domain: String,
    /// Port to listen on.
    pub listen_port: u16,
    /// Number of pooled store connections.
    pub pool_size: usize,
    /// PostgreSQL connection URL, if a relational backend is configured.
    pub database_url: Option<String>,
    /// Seed file for the in-memory location catalogue.
    pub locations_file: Option<PathBuf>,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable is missing.
    MissingEnvVar(String),
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEnvVar(name) => {
                write!(f, "missing required environment variable: {name}")
            }
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    /// Default port for the server.
    pub const DEFAULT_PORT: u16 = 3000;
    /// Default number of pooled connections.
    pub const DEFAULT_POOL_SIZE: usize = 8;
    /// Default token lifetime in seconds (two hours).
    pub const DEFAULT_TOKEN_VALIDITY_SECS: u64 = 7200;

    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is unset or empty, or if any
    /// variable is set to a value that cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// `from_env` uses the process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = required(&lookup, "SCOREKEEPER_JWT_SECRET")?.into_bytes();
        let cookie_domain = required(&lookup, "SCOREKEEPER_COOKIE_DOMAIN")?;

        let allowed_origins = lookup("SCOREKEEPER_ALLOWED_ORIGINS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let public_api = flag(&lookup, "SCOREKEEPER_PUBLIC_API")?;
        let testing_tool_allowed = flag(&lookup, "SCOREKEEPER_TESTING_TOOL_ALLOWED")?;

        let token_validity_secs = number(
            &lookup,
            "SCOREKEEPER_TOKEN_VALIDITY_SECS",
            Self::DEFAULT_TOKEN_VALIDITY_SECS,
        )?;
        if token_validity_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "SCOREKEEPER_TOKEN_VALIDITY_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        let listen_port = Self::load_listen_port(&lookup)?;

        let pool_size = number(&lookup, "SCOREKEEPER_POOL_SIZE", Self::DEFAULT_POOL_SIZE)?;
        if pool_size == 0 || pool_size > MAX_POOL_SIZE {
            return Err(ConfigError::InvalidValue {
                name: "SCOREKEEPER_POOL_SIZE".to_string(),
                message: format!("must be between 1 and {MAX_POOL_SIZE}"),
            });
        }

        Ok(Self {
            gate: GateConfig {
                allowed_origins,
                public_api,
                testing_tool_allowed,
            },
            jwt_secret,
            token_validity: Duration::from_secs(token_validity_secs),
            cookie_domain,
            listen_port,
            pool_size,
            database_url: lookup("SCOREKEEPER_DATABASE_URL").filter(|url| !url.is_empty()),
            locations_file: lookup("SCOREKEEPER_LOCATIONS_FILE")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
        })
    }

    /// Load the listen port.
    ///
    /// Returns the default if not set.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is set but not a valid port number.
    fn load_listen_port<F>(lookup: &F) -> Result<u16, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup("SCOREKEEPER_LISTEN_PORT") {
            Some(value) => match value.parse::<u16>() {
                Ok(port) if port > 0 => Ok(port),
                _ => Err(ConfigError::InvalidValue {
                    name: "SCOREKEEPER_LISTEN_PORT".to_string(),
                    message: format!("'{value}' is not a valid port number (must be 1-65535)"),
                }),
            },
            None => Ok(Self::DEFAULT_PORT),
        }
    }
}

fn required<F>(lookup: &F, name: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))?;
    if value.is_empty() {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            message: "must not be empty".to_string(),
        });
    }
    Ok(value)
}

fn flag<F>(lookup: &F, name: &str) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some(value) if value.eq_ignore_ascii_case("true") || value == "1" => Ok(true),
        Some(value) if value.eq_ignore_ascii_case("false") || value == "0" => Ok(false),
        Some(value) => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("'{value}' is not a boolean (expected true or false)"),
        }),
    }
}

fn number<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(name).map_or(Ok(default), |value| {
        value.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("'{value}' is not a valid number"),
        })
    })
}
