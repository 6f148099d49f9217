#![cfg_attr(test, allow(clippy::disallowed_methods))]
// Forbid unwrap() in production code.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
use std::net::SocketAddr;
use std::sync::Arc;

use scorekeeper::auth::{PasswordHasher, TokenIssuer};
use scorekeeper::store::{MemoryStore, Pool};
use scorekeeper::types::Location;
use scorekeeper::{AppState, ServerConfig, router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scorekeeper=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: listen_port={}, pool_size={}, public_api={}, allowed_origins={}",
        config.listen_port,
        config.pool_size,
        config.gate.public_api,
        config.gate.allowed_origins.len()
    );

    let tokens = match TokenIssuer::new(&config.jwt_secret, config.token_validity) {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::error!("Failed to create token issuer: {e}");
            std::process::exit(1);
        }
    };

    let pool = open_pool(&config).await.unwrap_or_else(|e| {
        tracing::error!("Failed to open store: {e}");
        std::process::exit(1);
    });

    let listen_port = config.listen_port;
    let state = AppState::new(config, pool, PasswordHasher::default(), tokens);
    #[allow(clippy::disallowed_methods)]
    let pool = Arc::clone(&state.pool);
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], listen_port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind: {e}");
            std::process::exit(1);
        });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Server error: {e}");
            std::process::exit(1);
        });

    pool.close();
    tracing::info!("store pool closed");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

/// Open the configured store.
///
/// A database URL selects PostgreSQL (feature `postgres`); otherwise the
/// in-memory store is used, seeded from the locations file if one is set.
async fn open_pool(config: &ServerConfig) -> Result<Pool, String> {
    if let Some(url) = &config.database_url {
        return open_postgres(url, config.pool_size).await;
    }

    let locations = match &config.locations_file {
        Some(path) => {
            let contents = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            serde_json::from_str::<Vec<Location>>(&contents)
                .map_err(|e| format!("cannot parse {}: {e}", path.display()))?
        }
        None => Vec::new(),
    };
    tracing::info!(
        "Using in-memory store with {} catalogue locations",
        locations.len()
    );
    Ok(MemoryStore::with_locations(locations).pool(config.pool_size))
}

#[cfg(feature = "postgres")]
async fn open_postgres(url: &str, size: usize) -> Result<Pool, String> {
    tracing::info!("Using PostgreSQL store");
    scorekeeper::store::PgStore::pool(url, size)
        .await
        .map_err(|e| e.to_string())
}

#[cfg(not(feature = "postgres"))]
async fn open_postgres(_url: &str, _size: usize) -> Result<Pool, String> {
    Err(
        "SCOREKEEPER_DATABASE_URL is set but the server was built without the postgres feature"
            .to_string(),
    )
}
