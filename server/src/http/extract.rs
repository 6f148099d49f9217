//! Typed credential extraction.
//!
//! A handler states which credential kinds it accepts through the marker type
//! of its [`Authenticated`] argument, e.g. `Authenticated<ApiKeyOnly>`.
//! Score submissions use [`ScoreSubmission`] instead, since their API key may
//! arrive in the JSON body.

use std::marker::PhantomData;

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use serde::Deserialize;

use super::AppState;
use crate::auth::{Credential, CredentialKind, CredentialVerifier, Identity};
use crate::error::ApiError;

/// The credential kinds an endpoint accepts.
pub trait Accepts {
    const KINDS: &'static [CredentialKind];
}

/// Only an opaque API key.
#[derive(Debug)]
pub enum ApiKeyOnly {}

impl Accepts for ApiKeyOnly {
    const KINDS: &'static [CredentialKind] = &[CredentialKind::ApiKey];
}

/// An opaque API key or a signed session token.
#[derive(Debug)]
pub enum ApiKeyOrToken {}

impl Accepts for ApiKeyOrToken {
    const KINDS: &'static [CredentialKind] = &[CredentialKind::ApiKey, CredentialKind::SessionToken];
}

/// The verified caller, resolved from the `Authorization` bearer.
#[derive(Debug)]
pub struct Authenticated<A> {
    pub identity: Identity,
    accepts: PhantomData<fn() -> A>,
}

impl<A> Authenticated<A> {
    const fn new(identity: Identity) -> Self {
        Self {
            identity,
            accepts: PhantomData,
        }
    }
}

impl<A: Accepts> FromRequestParts<AppState> for Authenticated<A> {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let credential = Credential::from_headers(&parts.headers).ok_or(ApiError::MissingCredential)?;
        let identity = CredentialVerifier::new(&state.pool, &state.tokens)
            .verify(&credential, A::KINDS)
            .await?;
        tracing::debug!(user_id = %identity.user_id, via = ?identity.via, "caller authenticated");
        Ok(Self::new(identity))
    }
}

/// Body of a score submission. Any `userId` the caller sends is ignored.
#[derive(Debug, Deserialize)]
pub struct SubmitScoreRequest {
    pub score: Option<i64>,
    #[serde(rename = "apiKey")]
    pub api_key: Option<String>,
}

/// A validated score from a verified caller.
///
/// The credential is the body's `apiKey` when present, otherwise the
/// `Authorization` bearer. Either kind in [`ApiKeyOrToken`] is accepted.
#[derive(Debug)]
pub struct ScoreSubmission {
    pub identity: Identity,
    pub score: i64,
}

impl FromRequest<AppState> for ScoreSubmission {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let headers = req.headers().clone();
        let Json(body) = Json::<SubmitScoreRequest>::from_request(req, state).await?;

        let credential = body
            .api_key
            .filter(|key| !key.is_empty())
            .map(Credential::ApiKey)
            .or_else(|| Credential::from_headers(&headers));
        let (Some(score), Some(credential)) = (body.score, credential) else {
            return Err(ApiError::Validation(
                "Score and a credential are required".to_string(),
            ));
        };
        if score < 0 {
            return Err(ApiError::Validation(
                "Score must be a non-negative integer".to_string(),
            ));
        }

        let identity = CredentialVerifier::new(&state.pool, &state.tokens)
            .verify(&credential, ApiKeyOrToken::KINDS)
            .await?;
        Ok(Self { identity, score })
    }
}
