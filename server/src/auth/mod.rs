//! Authentication module.
//!
//! Resolves who a caller is, and mints the session tokens handed out at login.
//!
//! # Pre-conditions
//! - The token issuer is constructed once per process with a non-empty secret.
//!
//! # Post-conditions
//! - A verified request carries exactly one `Identity`, derived from a
//!   credential and never from caller-supplied ids.
//!
//! # Invariants
//! - Credential verification never reads password digests; only login does.

pub mod credential;
pub mod password;
pub mod token;

pub use credential::{AuthError, Credential, CredentialKind, CredentialVerifier, Identity, bearer_token};
pub use password::{PasswordError, PasswordHasher};
pub use token::{DEFAULT_VALIDITY, SessionAssertion, TokenConfigError, TokenError, TokenIssuer};
