//! Admission middleware.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::AppState;
use crate::error::ApiError;
use crate::gate::Admission;

/// Gate every request before routing reaches a handler.
///
/// Denied requests get a generic 403 and never touch the store. Admitted
/// preflights get 204. Every admitted response carries the gate's CORS headers.
pub async fn admit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let origin = header_str(request.headers(), header::ORIGIN);
    let user_agent = header_str(request.headers(), header::USER_AGENT);

    let cors = match state.gate.decide(origin, user_agent) {
        Admission::Allow(cors) => cors,
        Admission::Deny => {
            tracing::warn!(origin, user_agent, path = %request.uri().path(), "admission denied");
            return ApiError::AdmissionDenied.into_response();
        }
    };

    let mut response = if request.method() == Method::OPTIONS {
        tracing::debug!(path = %request.uri().path(), "answering preflight");
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };
    cors.apply(response.headers_mut());
    response
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> &str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}
