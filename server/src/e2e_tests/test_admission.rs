//! Test the origin gate in front of every route.

use axum::http::{Method, Request, StatusCode, header};
use serde_json::json;

use crate::e2e_tests::helpers::*;
use crate::testing::test_config;

#[allow(clippy::expect_used)]
fn gated_request(
    origin: Option<&str>,
    user_agent: &str,
    method: Method,
    uri: &str,
) -> Request<axum::body::Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::USER_AGENT, user_agent);
    if let Some(origin) = origin {
        builder = builder.header(header::ORIGIN, origin);
    }
    builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            json!({ "username": "alice", "password": "secret" }).to_string(),
        ))
        .expect("valid request")
}

#[test]
fn test_disallowed_origin_denied_before_store_access() {
    let app = TestApp::new();
    let api_key = app.register_ok("alice", "secret");
    let before = app.acquisitions();

    for (method, uri) in [
        (Method::POST, "/register"),
        (Method::POST, "/login"),
        (Method::GET, "/scores"),
        (Method::POST, "/scores"),
        (Method::GET, "/location"),
        (Method::GET, "/countries"),
        (Method::GET, "/nowhere"),
    ] {
        #[allow(clippy::expect_used)]
        let mut request = gated_request(Some("https://evil.example"), BROWSER_AGENT, method, uri);
        request.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {api_key}").parse().expect("header value"),
        );
        let response = app.send(request);
        assert_eq!(response.status, StatusCode::FORBIDDEN, "{uri}");
        assert_eq!(
            response.body,
            json!({ "error": "Access denied: origin or tool not authorized" })
        );
        assert!(!response.headers.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    assert_eq!(app.acquisitions(), before);
    assert_eq!(app.store.user_count(), 1);
}

#[test]
fn test_missing_origin_denied() {
    let app = TestApp::new();
    let response = app.send(gated_request(None, BROWSER_AGENT, Method::POST, "/register"));
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(app.store.user_count(), 0);
}

#[test]
fn test_allowed_origin_echoed_with_credentials() {
    let app = TestApp::new();
    let response = app.register("alice", "secret");

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(
        response.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        ALLOWED_ORIGIN
    );
    assert_eq!(response.headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert_eq!(
        response.headers[header::ACCESS_CONTROL_ALLOW_METHODS],
        crate::gate::ALLOW_METHODS
    );
    assert_eq!(
        response.headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
        crate::gate::ALLOW_HEADERS
    );
}

#[test]
fn test_error_responses_carry_cors_headers() {
    let app = TestApp::new();
    let response = app.login("nobody", "secret");
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        ALLOWED_ORIGIN
    );
}

#[test]
fn test_mobile_clients_admitted_without_origin() {
    let app = TestApp::new();

    let android = app.send(gated_request(None, ANDROID_AGENT, Method::POST, "/register"));
    assert_eq!(android.status, StatusCode::CREATED);
    assert!(!android.headers.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));

    let ios = app.send(gated_request(None, IOS_AGENT, Method::POST, "/login"));
    assert_eq!(ios.status, StatusCode::OK);
}

#[test]
fn test_testing_tool_requires_flag() {
    let app = TestApp::new();
    let denied = app.send(gated_request(None, POSTMAN_AGENT, Method::POST, "/register"));
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let mut config = test_config();
    config.gate.testing_tool_allowed = true;
    let app = TestApp::with_config(config);
    let admitted = app.send(gated_request(None, POSTMAN_AGENT, Method::POST, "/register"));
    assert_eq!(admitted.status, StatusCode::CREATED);
}

#[test]
fn test_public_mode_uses_wildcard_without_credentials() {
    let mut config = test_config();
    config.gate.public_api = true;
    config.gate.allowed_origins.clear();
    let app = TestApp::with_config(config);

    let response = app.send(gated_request(
        Some("https://anyone.example"),
        BROWSER_AGENT,
        Method::POST,
        "/register",
    ));
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(
        response.headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
        "false"
    );
}

#[test]
fn test_preflight_short_circuits() {
    let app = TestApp::new();

    for uri in ["/register", "/scores", "/countries", "/nowhere"] {
        let response = app.send(empty(request(Method::OPTIONS, uri)));
        assert_eq!(response.status, StatusCode::NO_CONTENT, "{uri}");
        assert_eq!(response.body, serde_json::Value::Null);
        assert_eq!(
            response.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            ALLOWED_ORIGIN
        );
        assert_eq!(
            response.headers[header::ACCESS_CONTROL_ALLOW_METHODS],
            crate::gate::ALLOW_METHODS
        );
    }
    assert_eq!(app.acquisitions(), 0);
}

#[test]
fn test_preflight_from_disallowed_origin_denied() {
    let app = TestApp::new();

    #[allow(clippy::expect_used)]
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/scores")
        .header(header::ORIGIN, "https://evil.example")
        .header(header::USER_AGENT, BROWSER_AGENT)
        .body(axum::body::Body::empty())
        .expect("valid request");
    assert_eq!(app.send(request).status, StatusCode::FORBIDDEN);
}
