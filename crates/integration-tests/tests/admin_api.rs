//! HTTP tests against a running dashboard.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`vt-cli migrate`)
//! - The dashboard running (`cargo run -p vitrine-admin`)
//! - `ADMIN_TEST_TOKEN`: an access token from the identity service
//! - `ADMIN_TEST_STORE_ID`: a store owned by that user, for catalog tests
//!
//! Run with: `cargo test -p vitrine-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use reqwest::{Client, StatusCode, redirect};
use serde_json::{Value, json};

/// Base URL for the dashboard (configurable via environment).
fn admin_base_url() -> String {
    std::env::var("ADMIN_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_owned())
}

fn test_token() -> String {
    std::env::var("ADMIN_TEST_TOKEN").expect("ADMIN_TEST_TOKEN must be set")
}

fn test_store_id() -> String {
    std::env::var("ADMIN_TEST_STORE_ID").expect("ADMIN_TEST_STORE_ID must be set")
}

/// Client that keeps cookies and does not follow redirects.
fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Exchange the bearer token for a session cookie.
async fn signed_in_client() -> Client {
    let client = client();
    let resp = client
        .post(format!("{}/auth/session", admin_base_url()))
        .bearer_auth(test_token())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    client
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
#[ignore = "requires running dashboard"]
async fn test_health_endpoints() {
    let client = client();
    let base = admin_base_url();

    let resp = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");

    let resp = client.get(format!("{base}/health/ready")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
#[ignore = "requires running dashboard"]
async fn test_api_without_credentials_is_unauthorized() {
    let resp = client()
        .get(format!("{}/api/stores", admin_base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires running dashboard"]
async fn test_pages_redirect_to_login() {
    let resp = client().get(admin_base_url()).send().await.unwrap();
    assert!(resp.status().is_redirection());
    assert_eq!(
        resp.headers().get("location").unwrap().to_str().unwrap(),
        "/login"
    );
}

#[tokio::test]
#[ignore = "requires running dashboard and identity service"]
async fn test_me_reports_balance_and_cost() {
    let resp = client()
        .get(format!("{}/api/me", admin_base_url()))
        .bearer_auth(test_token())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert!(body["credits"].is_number());
    assert_eq!(body["store_creation_cost"], 50);
}

#[tokio::test]
#[ignore = "requires running dashboard and identity service"]
async fn test_session_cookie_replaces_bearer() {
    let client = signed_in_client().await;
    let resp = client
        .get(format!("{}/api/me", admin_base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// ============================================================================
// Stores
// ============================================================================

#[tokio::test]
#[ignore = "requires running dashboard and identity service"]
async fn test_invalid_store_request_is_rejected_before_charging() {
    let client = signed_in_client().await;
    let base = admin_base_url();

    let before: Value = client
        .get(format!("{base}/api/me"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let resp = client
        .post(format!("{base}/api/stores"))
        .json(&json!({ "name": "   ", "contact_email": "owner@shop.test" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let after: Value = client
        .get(format!("{base}/api/me"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(before["credits"], after["credits"]);
}

#[tokio::test]
#[ignore = "requires running dashboard and identity service"]
async fn test_unknown_store_is_not_found() {
    let client = signed_in_client().await;
    let resp = client
        .get(format!(
            "{}/api/stores/00000000-0000-0000-0000-000000000000/products",
            admin_base_url()
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
#[ignore = "requires running dashboard, identity service and a test store"]
async fn test_failed_product_save_leaves_no_new_attribute() {
    let client = signed_in_client().await;
    let base = admin_base_url();
    let store = test_store_id();
    let attribute = format!("Scent {}", uuid::Uuid::new_v4().simple());

    let resp = client
        .put(format!(
            "{base}/api/stores/{store}/products/00000000-0000-0000-0000-000000000000"
        ))
        .json(&json!({
            "name": "Candle",
            "base_price": "12.00",
            "attributes": [{ "name": attribute, "values": ["Pine", "Cedar"] }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = client
        .get(format!("{base}/api/stores/{store}/attributes"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let custom = body["custom"].as_array().unwrap();
    assert!(custom.iter().all(|a| a["name"] != attribute.as_str()));
}

// ============================================================================
// Variants
// ============================================================================

#[tokio::test]
#[ignore = "requires running dashboard and identity service"]
async fn test_variant_preview() {
    let client = signed_in_client().await;
    let resp = client
        .post(format!("{}/api/variants/preview", admin_base_url()))
        .json(&json!({
            "attributes": [
                { "name": "Size", "values": ["S", "M", "L"] },
                { "name": "Color", "values": ["Red", "Blue"] }
            ],
            "defaults": { "quantity": 3 }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["count"], 6);
    assert_eq!(body["variants"][0]["quantity"], 3);
}
