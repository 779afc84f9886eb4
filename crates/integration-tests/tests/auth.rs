//! End-to-end authentication and role tests.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`paw-cli migrate`)
//! - The storefront server running (`cargo run -p paw-storefront`)
//!
//! Auth routes are rate limited per IP, so keep the number of logins here
//! small.

#![allow(clippy::unwrap_used)]

use paw_core::UserRole;
use paw_integration_tests::{TEST_PASSWORD, TestContext};
use reqwest::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_register_logs_in_until_logout() {
    let ctx = TestContext::new().await;
    let email = format!("test-{}@example.com", Uuid::new_v4().simple());

    let resp = ctx
        .client
        .post(ctx.url("/api/auth/register"))
        .json(&json!({ "name": "New Customer", "email": email, "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let user: Value = resp.json().await.unwrap();
    assert_eq!(user["role"], "customer");
    assert!(user.get("password_hash").is_none());

    let me: Value = ctx
        .client
        .get(ctx.url("/api/auth/me"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["email"], email.as_str());

    let resp = ctx
        .client
        .post(ctx.url("/api/auth/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = ctx.client.get(ctx.url("/api/auth/me")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_customer_cannot_use_admin_api() {
    let ctx = TestContext::new().await;
    let (_, email) = ctx.create_user(UserRole::Customer).await;
    ctx.login(&email).await;

    let resp = ctx
        .client
        .get(ctx.url("/api/admin/orders"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_admin_sees_analytics() {
    let ctx = TestContext::new().await;
    let (_, email) = ctx.create_user(UserRole::Admin).await;
    ctx.login(&email).await;

    let resp = ctx
        .client
        .get(ctx.url("/api/admin/analytics"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert!(body["salesByDay"].is_array());
    assert!(body["bestSellers"].is_array());
    assert!(body["stats"]["totalProducts"].as_i64().unwrap() >= 0);
}
