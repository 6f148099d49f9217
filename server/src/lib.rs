// Life of a request:
// 1. Admission: the origin gate decides from Origin / User-Agent alone
//     - Denied: 403, nothing else runs
//     - Preflight: 204 with CORS headers
// 2. Routing to a handler (404 / 405 otherwise)
// 3. Authentication: the bearer (or body API key) resolves to an identity
//     - API keys are looked up in the store
//     - Session tokens are verified by signature and expiry only
// 4. Business logic over a pooled store connection
//     - Score submissions go through one atomic upsert
//
// System components:
//  - Origin gate
//  - Credential verifier and token issuer
//  - Score ledger
//  - Credential store behind a fixed-size pool

pub mod accounts;
pub mod auth;
pub mod config;
pub mod error;
pub mod gate;
pub mod http;
pub mod ledger;
pub mod store;
pub mod time;
pub mod types;

#[cfg(test)]
mod e2e_tests;
#[cfg(test)]
mod testing;

pub use config::ServerConfig;
pub use http::{AppState, router};
