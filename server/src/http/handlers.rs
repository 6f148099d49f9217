//! Endpoint handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::extract::{ApiKeyOnly, ApiKeyOrToken, Authenticated, ScoreSubmission};
use crate::accounts::Accounts;
use crate::error::ApiError;
use crate::ledger::ScoreLedger;
use crate::types::{Coordinates, UserId};

/// Body of `/register` and `/login`.
#[derive(Debug, Deserialize)]
pub struct AccountRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl AccountRequest {
    fn into_fields(self) -> Result<(String, String), ApiError> {
        match (self.username, self.password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Ok((username, password))
            }
            _ => Err(ApiError::Validation(
                "Username and password are required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    #[serde(rename = "apiKey")]
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "apiKey")]
    pub api_key: Option<String>,
    pub user_id: UserId,
    pub best_score: i64,
    pub last_score: i64,
}

#[derive(Debug, Serialize)]
pub struct SubmitScoreResponse {
    pub message: String,
    pub best_score: i64,
    pub last_score: i64,
}

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub country: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub location: Coordinates,
}

#[derive(Debug, Serialize)]
pub struct CountriesResponse {
    pub countries: Vec<String>,
    pub cities: Vec<String>,
}

pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<AccountRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let (username, password) = body.into_fields()?;

    let registration = Accounts::new(&state.pool, &state.hasher, &state.tokens)
        .register(&username, &password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            api_key: registration.api_key,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<AccountRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let (username, password) = body.into_fields()?;

    let outcome = Accounts::new(&state.pool, &state.hasher, &state.tokens)
        .login(&username, &password)
        .await?;

    let cookie = session_cookie(
        &outcome.token,
        &state.config.cookie_domain,
        state.tokens.validity().as_secs(),
    );
    let cookie = HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::Internal(format!("session cookie is not a valid header: {e}")))?;

    let mut response = Json(LoginResponse {
        token: outcome.token,
        api_key: outcome.api_key,
        user_id: outcome.user_id,
        best_score: outcome.scores.best_score,
        last_score: outcome.scores.last_score,
    })
    .into_response();
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    Ok(response)
}

/// The `Set-Cookie` value carrying a session token.
#[must_use]
pub fn session_cookie(token: &str, domain: &str, max_age_secs: u64) -> String {
    format!(
        "token={token}; Path=/; HttpOnly; Secure; SameSite=None; Domain={domain}; Max-Age={max_age_secs}"
    )
}

pub async fn submit_score(
    State(state): State<AppState>,
    ScoreSubmission { identity, score }: ScoreSubmission,
) -> Result<Json<SubmitScoreResponse>, ApiError> {
    let record = ScoreLedger::new(&state.pool)
        .submit(identity.user_id, score)
        .await?;
    tracing::debug!(
        user_id = %identity.user_id,
        via = ?identity.via,
        score,
        best = record.best_score,
        "score applied"
    );

    Ok(Json(SubmitScoreResponse {
        message: "Score updated successfully".to_string(),
        best_score: record.best_score,
        last_score: record.last_score,
    }))
}

pub async fn get_scores(
    State(state): State<AppState>,
    caller: Authenticated<ApiKeyOnly>,
) -> Result<impl IntoResponse, ApiError> {
    let record = ScoreLedger::new(&state.pool)
        .get_scores(caller.identity.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No scores found for user".to_string()))?;
    Ok(Json(record))
}

pub async fn location(
    State(state): State<AppState>,
    _caller: Authenticated<ApiKeyOrToken>,
    query: Result<Query<LocationQuery>, QueryRejection>,
) -> Result<Json<LocationResponse>, ApiError> {
    let Query(query) = query?;
    let country = query
        .country
        .as_deref()
        .map(str::trim)
        .filter(|country| !country.is_empty());

    let mut connection = state.pool.acquire().await?;
    let location = connection
        .random_location(country)
        .await?
        .ok_or_else(|| ApiError::NotFound("No location found".to_string()))?;

    Ok(Json(LocationResponse {
        location: location.coordinates(),
    }))
}

pub async fn countries(
    State(state): State<AppState>,
    _caller: Authenticated<ApiKeyOnly>,
) -> Result<Json<CountriesResponse>, ApiError> {
    let mut connection = state.pool.acquire().await?;
    let countries = connection.countries().await?;
    let cities = connection.destination_types().await?;
    drop(connection);

    if countries.is_empty() || cities.is_empty() {
        return Err(ApiError::NotFound("No countries found".to_string()));
    }
    Ok(Json(CountriesResponse { countries, cities }))
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}
