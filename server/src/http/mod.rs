//! HTTP surface.
//!
//! Life of a request:
//! 1. The admission middleware consults the [`OriginGate`]. Denied requests
//!    end here with 403; preflights end here with 204.
//! 2. Routing picks a handler, or answers 404 / 405.
//! 3. The handler's [`Authenticated`] extractor resolves the caller.
//! 4. The handler runs, acquiring pooled connections as it needs them.

mod admission;
mod extract;
mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};

pub use admission::admit;
pub use extract::{Accepts, ApiKeyOnly, ApiKeyOrToken, Authenticated, ScoreSubmission};

use crate::auth::{PasswordHasher, TokenIssuer};
use crate::config::ServerConfig;
use crate::gate::OriginGate;
use crate::store::Pool;

/// State shared by every request. Everything in it is immutable or
/// internally synchronised.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub gate: Arc<OriginGate>,
    pub pool: Arc<Pool>,
    pub hasher: Arc<PasswordHasher>,
    pub tokens: Arc<TokenIssuer>,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: ServerConfig,
        pool: Pool,
        hasher: PasswordHasher,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            gate: Arc::new(OriginGate::new(&config.gate)),
            config: Arc::new(config),
            pool: Arc::new(pool),
            hasher: Arc::new(hasher),
            tokens: Arc::new(tokens),
        }
    }
}

/// Build the application router.
#[allow(clippy::disallowed_methods)] // Cloning the state clones its Arcs.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/register",
            post(handlers::register).fallback(handlers::method_not_allowed),
        )
        .route(
            "/login",
            post(handlers::login).fallback(handlers::method_not_allowed),
        )
        .route(
            "/scores",
            get(handlers::get_scores)
                .post(handlers::submit_score)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/location",
            get(handlers::location).fallback(handlers::method_not_allowed),
        )
        .route(
            "/countries",
            get(handlers::countries).fallback(handlers::method_not_allowed),
        )
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(state.clone(), admit))
        .with_state(state)
}
