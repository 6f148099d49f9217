//! Test the location catalogue endpoints.

use axum::http::StatusCode;
use serde_json::json;

use crate::e2e_tests::helpers::*;
use crate::testing::{sample_locations, test_config};

fn coordinates(response: &TestResponse) -> (f64, f64) {
    (
        response.body["location"]["latitude"].as_f64().unwrap_or(f64::NAN),
        response.body["location"]["longitude"].as_f64().unwrap_or(f64::NAN),
    )
}

fn is_catalogued(country: Option<&str>, (latitude, longitude): (f64, f64)) -> bool {
    sample_locations().iter().any(|location| {
        country.is_none_or(|country| location.country == country)
            && (location.latitude - latitude).abs() < 1e-9
            && (location.longitude - longitude).abs() < 1e-9
    })
}

#[test]
fn test_random_location() {
    let app = TestApp::new();
    let api_key = app.register_ok("alice", "secret");

    let response = app.get_with_bearer("/location", &api_key);
    assert_eq!(response.status, StatusCode::OK);
    assert!(is_catalogued(None, coordinates(&response)));

    let location = response.body["location"].as_object().map(|o| o.len());
    assert_eq!(location, Some(2));
}

#[test]
fn test_location_filtered_by_country() {
    let app = TestApp::new();
    let api_key = app.register_ok("alice", "secret");

    for _ in 0..10 {
        let response = app.get_with_bearer("/location?country=france", &api_key);
        assert_eq!(response.status, StatusCode::OK);
        assert!(is_catalogued(Some("France"), coordinates(&response)));
    }

    let japan = app.get_with_bearer("/location?country=Japan", &api_key);
    assert_eq!(coordinates(&japan), (35.6586, 139.7454));
}

#[test]
fn test_empty_country_means_any() {
    let app = TestApp::new();
    let api_key = app.register_ok("alice", "secret");

    let response = app.get_with_bearer("/location?country=", &api_key);
    assert_eq!(response.status, StatusCode::OK);
}

#[test]
fn test_unknown_country_not_found() {
    let app = TestApp::new();
    let api_key = app.register_ok("alice", "secret");

    let response = app.get_with_bearer("/location?country=Atlantis", &api_key);
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body, json!({ "error": "No location found" }));
}

#[test]
fn test_countries_and_destination_types() {
    let app = TestApp::new();
    let api_key = app.register_ok("alice", "secret");

    let response = app.get_with_bearer("/countries", &api_key);
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({
            "countries": ["France", "Japan"],
            "cities": ["city", "mountain"],
        })
    );
}

#[test]
fn test_empty_catalogue_not_found() {
    let app = TestApp::with_config_and_locations(test_config(), Vec::new());
    let api_key = app.register_ok("alice", "secret");

    assert_eq!(
        app.get_with_bearer("/countries", &api_key).status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.get_with_bearer("/location", &api_key).status,
        StatusCode::NOT_FOUND
    );
}
