//! Test concurrent score submissions through the full router.

use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::e2e_tests::helpers::*;

#[test]
fn test_concurrent_submissions_keep_maximum() {
    let app = TestApp::new();
    let api_key = app.register_ok("alice", "secret");
    let scores: Vec<i64> = (0..100).map(|i| (i * 53) % 500).collect();
    let expected_best = scores.iter().copied().max().unwrap_or_default();

    let statuses = app.runtime.block_on(async {
        let tasks: Vec<_> = scores
            .iter()
            .map(|&score| {
                let state = app.state.clone();
                let request = json_request(
                    Method::POST,
                    "/scores",
                    &json!({ "score": score, "apiKey": api_key }),
                );
                tokio::spawn(async move { send(&state, request).await.status })
            })
            .collect();
        futures::future::join_all(tasks).await
    });

    for status in statuses {
        assert_eq!(status.ok(), Some(StatusCode::OK));
    }

    let read = app.get_with_bearer("/scores", &api_key);
    assert_eq!(read.body["best_score"], json!(expected_best));
    assert!(scores.contains(&read.body["last_score"].as_i64().unwrap_or(-1)));
    assert_eq!(app.state.pool.idle_count(), app.state.pool.size());
}

#[test]
fn test_interleaved_users_do_not_interfere() {
    let app = TestApp::new();
    let alice = app.register_ok("alice", "secret");
    let bob = app.register_ok("bob", "secret");

    app.runtime.block_on(async {
        let tasks: Vec<_> = (0..50_i64)
            .map(|i| {
                let state = app.state.clone();
                let (key, score) = if i % 2 == 0 { (&alice, i) } else { (&bob, 1000 - i) };
                let request = json_request(
                    Method::POST,
                    "/scores",
                    &json!({ "score": score, "apiKey": key }),
                );
                tokio::spawn(async move { send(&state, request).await.status })
            })
            .collect();
        futures::future::join_all(tasks).await
    });

    assert_eq!(
        app.get_with_bearer("/scores", &alice).body["best_score"],
        json!(48)
    );
    assert_eq!(
        app.get_with_bearer("/scores", &bob).body["best_score"],
        json!(999)
    );
}
