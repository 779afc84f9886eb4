//! End-to-end catalog tests.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`paw-cli migrate`)
//! - The storefront server running (`cargo run -p paw-storefront`)

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use paw_core::ReviewStatus;
use paw_integration_tests::TestContext;
use reqwest::StatusCode;
use serde_json::Value;

async fn search(ctx: &TestContext, query: &str) -> Vec<Value> {
    let resp = ctx
        .client
        .get(ctx.url(&format!("/api/products?{query}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    resp.json().await.unwrap()
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_category_filter_hides_inactive_products() {
    let ctx = TestContext::new().await;
    let cat = ctx.create_product("cats", &[3000], 5).await;
    let dog = ctx.create_product("dogs", &[3000], 5).await;
    let hidden = ctx.create_product("cats", &[3000], 5).await;
    ctx.deactivate(hidden.product_id).await;

    let listed: Vec<String> = search(&ctx, "category=cats&q=Test%20Mat")
        .await
        .iter()
        .map(|p| p["sku"].as_str().unwrap().to_string())
        .collect();

    assert!(listed.contains(&cat.sku));
    assert!(!listed.contains(&dog.sku));
    assert!(!listed.contains(&hidden.sku));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_listing_price_is_cheapest_variant() {
    let ctx = TestContext::new().await;
    let product = ctx.create_product("dogs", &[5000, 3000, 4500], 5).await;

    let results = search(&ctx, &format!("q={}", product.sku)).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["price_pkr"].as_f64(), Some(3000.0));
    assert_eq!(results[0]["variants"].as_array().unwrap().len(), 3);
    assert_eq!(results[0]["variants"][0]["size"], "small");
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_rating_counts_only_approved_reviews() {
    let ctx = TestContext::new().await;
    let product = ctx.create_product("dogs", &[3000], 5).await;
    for stars in [5, 3, 4] {
        ctx.add_review(product.product_id, stars, ReviewStatus::Approved)
            .await;
    }
    ctx.add_review(product.product_id, 1, ReviewStatus::Pending).await;

    let results = search(&ctx, &format!("q={}", product.sku)).await;
    assert_eq!(results[0]["averageRating"].as_f64(), Some(4.0));
    assert_eq!(results[0]["reviewCount"], 3);

    let detail: Value = ctx
        .client
        .get(ctx.url(&format!("/api/products/{}", product.product_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["averageRating"].as_f64(), Some(4.0));
    assert_eq!(detail["reviews"].as_array().unwrap().len(), 3);
    assert_eq!(detail["reviews"][0]["user_name"], "Test User");
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_inactive_product_detail_is_not_found() {
    let ctx = TestContext::new().await;
    let product = ctx.create_product("cats", &[3000], 5).await;
    ctx.deactivate(product.product_id).await;

    let resp = ctx
        .client
        .get(ctx.url(&format!("/api/products/{}", product.product_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_malformed_price_bound_is_rejected() {
    let ctx = TestContext::new().await;
    let resp = ctx
        .client
        .get(ctx.url("/api/products?minPrice=cheap"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["fields"][0]["field"], "minPrice");
}
