//! End-to-end cart tests.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`paw-cli migrate`)
//! - The storefront server running (`cargo run -p paw-storefront`)

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use paw_integration_tests::TestContext;
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_adding_same_line_twice_increments_quantity() {
    let ctx = TestContext::new().await;
    let product = ctx.create_product("dogs", &[3000, 4500], 10).await;
    let body = json!({
        "productId": product.product_id,
        "variantId": product.variant_ids[1],
        "quantity": 2
    });

    for _ in 0..2 {
        let resp = ctx
            .cart_request(Method::POST, "/api/cart/add")
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let cart: Value = ctx
        .cart_request(Method::GET, "/api/cart")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["items"][0]["quantity"], 4);
    assert_eq!(cart["items"][0]["size"], "medium");
    assert_eq!(cart["total"].as_f64(), Some(18000.0));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_update_to_zero_removes_line() {
    let ctx = TestContext::new().await;
    let product = ctx.create_product("cats", &[3000], 10).await;
    let variant_id = product.variant_ids[0];

    ctx.cart_request(Method::POST, "/api/cart/add")
        .json(&json!({ "productId": product.product_id, "variantId": variant_id }))
        .send()
        .await
        .unwrap();

    let cart: Value = ctx
        .cart_request(Method::PUT, "/api/cart/update")
        .json(&json!({
            "productId": product.product_id,
            "variantId": variant_id,
            "quantity": 0
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(cart["items"].as_array().unwrap().is_empty());
    assert_eq!(cart["total"].as_f64(), Some(0.0));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_add_beyond_stock_is_conflict() {
    let ctx = TestContext::new().await;
    let product = ctx.create_product("dogs", &[3000], 2).await;

    let resp = ctx
        .cart_request(Method::POST, "/api/cart/add")
        .json(&json!({
            "productId": product.product_id,
            "variantId": product.variant_ids[0],
            "quantity": 3
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_stock");
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_variant_of_another_product_is_not_found() {
    let ctx = TestContext::new().await;
    let a = ctx.create_product("dogs", &[3000], 5).await;
    let b = ctx.create_product("dogs", &[3000], 5).await;

    let resp = ctx
        .cart_request(Method::POST, "/api/cart/add")
        .json(&json!({ "productId": a.product_id, "variantId": b.variant_ids[0] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_sessions_are_isolated() {
    let ctx = TestContext::new().await;
    let product = ctx.create_product("dogs", &[3000], 5).await;

    ctx.cart_request(Method::POST, "/api/cart/add")
        .json(&json!({ "productId": product.product_id, "variantId": product.variant_ids[0] }))
        .send()
        .await
        .unwrap();

    let other: Value = ctx
        .client
        .get(ctx.url("/api/cart"))
        .header("x-session-id", format!("{}-other", ctx.cart_session))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(other["items"].as_array().unwrap().is_empty());
}
