//! HTTP-facing error taxonomy.
//!
//! Every failure leaving a handler is an [`ApiError`], rendered as a status
//! code and a `{"error": <message>}` body. Internal causes are logged here and
//! replaced by a generic message.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::accounts::AccountError;
use crate::auth::{AuthError, PasswordError, TokenError};
use crate::ledger::LedgerError;
use crate::store::StoreError;

/// Body of a denied admission.
pub const ADMISSION_DENIED_MESSAGE: &str = "Access denied: origin or tool not authorized";

/// Error returned by request handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The origin or client is not admitted.
    AdmissionDenied,
    /// No credential accompanied the request.
    MissingCredential,
    /// The credential did not resolve to a user.
    InvalidCredential,
    /// Login failed; unknown user and wrong password are indistinguishable.
    InvalidCredentials,
    /// Malformed or missing input.
    Validation(String),
    /// No such resource.
    NotFound(String),
    /// The route exists but not for this method.
    MethodNotAllowed,
    /// Datastore or unexpected failure; the detail is logged, not returned.
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::AdmissionDenied => StatusCode::FORBIDDEN,
            Self::MissingCredential | Self::InvalidCredential | Self::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message returned to the caller.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::AdmissionDenied => ADMISSION_DENIED_MESSAGE.to_string(),
            Self::MissingCredential => "Missing credential".to_string(),
            Self::InvalidCredential => "Invalid credential".to_string(),
            Self::InvalidCredentials => "Invalid credentials".to_string(),
            Self::Validation(message) | Self::NotFound(message) => message.clone(),
            Self::MethodNotAllowed => "Method not allowed".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Internal(detail) => write!(f, "internal error: {detail}"),
            other => write!(f, "{}", other.message()),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            tracing::error!("request failed: {detail}");
        }
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateUsername => Self::Validation("Username already exists".to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingCredential => Self::MissingCredential,
            AuthError::InvalidCredential => Self::InvalidCredential,
            AuthError::Store(e) => e.into(),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::NegativeScore(_) => {
                Self::Validation("Score must be a non-negative integer".to_string())
            }
            LedgerError::Store(e) => e.into(),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::Validation(message) => Self::Validation(message),
            AccountError::DuplicateUsername => Self::Validation("Username already exists".to_string()),
            AccountError::InvalidCredentials => Self::InvalidCredentials,
            AccountError::Store(e) => e.into(),
            AccountError::Password(e) => e.into(),
            AccountError::Token(e) => e.into(),
            AccountError::Task(reason) => Self::Internal(reason),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(e: PasswordError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("rejected request body: {rejection}");
        Self::Validation("Invalid JSON body".to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!("rejected query string: {rejection}");
        Self::Validation("Invalid query string".to_string())
    }
}
