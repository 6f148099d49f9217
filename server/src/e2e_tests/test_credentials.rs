//! Test credential verification on every protected endpoint.

use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::e2e_tests::helpers::*;

const UNKNOWN_KEY: &str = "0000000000000000000000000000000000000000000000000000000000000000";
const MALFORMED_TOKEN: &str = "not.a.token";

#[test]
fn test_unknown_api_key_rejected_everywhere() {
    let app = TestApp::new();
    let _api_key = app.register_ok("alice", "secret");

    for uri in ["/scores", "/location", "/countries"] {
        let response = app.get_with_bearer(uri, UNKNOWN_KEY);
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "GET {uri}");
        assert_eq!(response.error(), "Invalid credential");
    }

    let submit = app.submit_score(UNKNOWN_KEY, 10);
    assert_eq!(submit.status, StatusCode::UNAUTHORIZED);
}

#[test]
fn test_malformed_credentials_rejected_everywhere() {
    let app = TestApp::new();

    for bearer in [MALFORMED_TOKEN, "short", "a.b.c.d"] {
        for uri in ["/scores", "/location", "/countries"] {
            let response = app.get_with_bearer(uri, bearer);
            assert_eq!(response.status, StatusCode::UNAUTHORIZED, "GET {uri} with {bearer}");
        }
        let submit = app.submit_score(bearer, 10);
        assert_eq!(submit.status, StatusCode::UNAUTHORIZED, "POST /scores with {bearer}");
    }
}

#[test]
fn test_missing_bearer_rejected() {
    let app = TestApp::new();

    for uri in ["/scores", "/location", "/countries"] {
        let response = app.send(empty(request(Method::GET, uri)));
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "GET {uri}");
        assert_eq!(response.error(), "Missing credential");
    }

    #[allow(clippy::expect_used)]
    let basic = request(Method::GET, "/scores")
        .header("authorization", "Basic YWxpY2U6c2VjcmV0")
        .body(axum::body::Body::empty())
        .expect("valid request");
    assert_eq!(app.send(basic).status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.acquisitions(), 0);
}

#[test]
fn test_session_token_not_accepted_for_key_only_endpoints() {
    let app = TestApp::new();
    let _api_key = app.register_ok("alice", "secret");
    let token = app.login_ok("alice", "secret");

    assert_eq!(
        app.get_with_bearer("/scores", &token).status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.get_with_bearer("/countries", &token).status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(app.get_with_bearer("/location", &token).status, StatusCode::OK);
}

#[test]
fn test_session_token_in_body_is_not_an_api_key() {
    let app = TestApp::new();
    let _api_key = app.register_ok("alice", "secret");
    let token = app.login_ok("alice", "secret");

    let response = app.send(json_request(
        Method::POST,
        "/scores",
        &json!({ "score": 10, "apiKey": token }),
    ));
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[test]
fn test_expired_token_rejected() {
    let app = TestApp::new();
    let _api_key = app.register_ok("alice", "secret");
    let token = app.login_ok("alice", "secret");

    app.time.advance(app.state.tokens.validity().as_secs() - 1);
    assert_eq!(app.get_with_bearer("/location", &token).status, StatusCode::OK);

    app.time.advance(1);
    let response = app.get_with_bearer("/location", &token);
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error(), "Invalid credential");
}

#[test]
fn test_token_signed_with_other_secret_rejected() {
    let app = TestApp::new();
    let api_key = app.register_ok("alice", "secret");
    let user_id = app.login("alice", "secret").body["user_id"]
        .as_i64()
        .unwrap_or_default();

    #[allow(clippy::expect_used)]
    let forged = crate::auth::TokenIssuer::new(b"some-other-secret", crate::auth::DEFAULT_VALIDITY)
        .expect("issuer")
        .issue(crate::types::UserId(user_id), "alice")
        .expect("token");

    assert_eq!(
        app.get_with_bearer("/location", &forged).status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(app.get_with_bearer("/scores", &api_key).status, StatusCode::OK);
}

#[test]
fn test_lowercase_bearer_scheme_accepted() {
    let app = TestApp::new();
    let api_key = app.register_ok("alice", "secret");

    #[allow(clippy::expect_used)]
    let read = request(Method::GET, "/scores")
        .header("authorization", format!("bearer {api_key}"))
        .body(axum::body::Body::empty())
        .expect("valid request");
    let response = app.send(read);
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "best_score": 0, "last_score": 0 }));

    #[allow(clippy::expect_used)]
    let submit = request(Method::POST, "/scores")
        .header("authorization", format!("BEARER {api_key}"))
        .header("content-type", "application/json")
        .body(axum::body::Body::from(json!({ "score": 7 }).to_string()))
        .expect("valid request");
    let response = app.send(submit);
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["best_score"], json!(7));
}
