//! Integration tests for The Paw International storefront.
//!
//! # Running Tests
//!
//! ```bash
//! # Migrate the database and start the server
//! cargo run -p paw-cli -- migrate
//! cargo run -p paw-storefront
//!
//! # Run the ignored end-to-end tests
//! cargo test -p paw-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_TEST_URL` - Server under test (default: `http://localhost:3001`)
//! - `STOREFRONT_DATABASE_URL` - Same database the server uses, for fixtures
//!   and assertions (falls back to `DATABASE_URL`)
//!
//! Fixtures are created through the storefront's own repositories with
//! unique SKUs and emails, so tests can run in parallel against a shared
//! database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use paw_core::{ProductId, Rating, ReviewStatus, UserId, UserRole, VariantId};
use paw_storefront::db::products::ProductRepository;
use paw_storefront::db::reviews::ReviewRepository;
use paw_storefront::models::product::{NewProductInput, NewVariantInput};
use paw_storefront::services::auth::AuthService;
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

/// Password used for every fixture account.
pub const TEST_PASSWORD: &str = "correct horse battery";

/// Shared handles for one test.
pub struct TestContext {
    /// HTTP client with a cookie store, so logins persist across requests.
    pub client: Client,
    pub base_url: String,
    pub pool: PgPool,
    /// Value sent as `x-session-id` by [`TestContext::cart_request`].
    pub cart_session: String,
}

/// A product created for a test.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub product_id: ProductId,
    /// Variants in small, medium, large order.
    pub variant_ids: Vec<VariantId>,
    pub title: String,
    pub sku: String,
}

impl TestContext {
    /// Connect to the database and build a fresh client.
    pub async fn new() -> Self {
        dotenvy::dotenv().ok();

        let base_url = std::env::var("STOREFRONT_TEST_URL")
            .unwrap_or_else(|_| "http://localhost:3001".to_string());
        let database_url = std::env::var("STOREFRONT_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .expect("STOREFRONT_DATABASE_URL or DATABASE_URL must be set");
        let pool = paw_storefront::db::create_pool(&SecretString::from(database_url))
            .await
            .expect("Failed to connect to test database");

        Self {
            client: Self::client(),
            base_url,
            pool,
            cart_session: format!("test-{}", Uuid::new_v4()),
        }
    }

    /// A new client with its own cookie jar.
    pub fn client() -> Client {
        Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client")
    }

    /// Absolute URL of an API path such as `/api/cart`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Start a request that carries this test's cart session.
    pub fn cart_request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header("x-session-id", &self.cart_session)
    }

    /// Create an active product whose variants are priced `prices` (small,
    /// medium, large order) with `stock` units each.
    pub async fn create_product(&self, category: &str, prices: &[i64], stock: i32) -> Fixture {
        let marker = Uuid::new_v4().simple().to_string();
        let title = format!("Test Mat {marker}");
        let sku = format!("TEST-{marker}");
        let sizes = ["small", "medium", "large"];

        let input = NewProductInput {
            title: title.clone(),
            sku: sku.clone(),
            description: Some("Integration test fixture".to_string()),
            price_pkr: None,
            category: category.to_string(),
            stock: None,
            variants: sizes
                .iter()
                .zip(prices)
                .map(|(size, price)| NewVariantInput {
                    size: (*size).to_string(),
                    price_pkr: Decimal::from(*price),
                    stock,
                    dimensions: None,
                    product_code: None,
                })
                .collect(),
            images: vec![format!("images/{marker}.jpeg")],
        };

        let repo = ProductRepository::new(&self.pool);
        let product = repo.create(&input.validate().unwrap()).await.unwrap();
        let variant_ids = repo
            .variants(product.id)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.id)
            .collect();

        Fixture {
            product_id: product.id,
            variant_ids,
            title,
            sku,
        }
    }

    /// Hide a product from the storefront.
    pub async fn deactivate(&self, product_id: ProductId) {
        sqlx::query("UPDATE shop.products SET is_active = FALSE WHERE id = $1")
            .bind(product_id)
            .execute(&self.pool)
            .await
            .unwrap();
    }

    /// Current stock of a variant.
    pub async fn variant_stock(&self, variant_id: VariantId) -> i32 {
        sqlx::query_scalar("SELECT stock FROM shop.product_variants WHERE id = $1")
            .bind(variant_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    /// Number of order lines that reference a product.
    pub async fn order_lines_for(&self, product_id: ProductId) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM shop.order_items WHERE product_id = $1")
            .bind(product_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    /// Create an account directly in the database; returns its id and email.
    pub async fn create_user(&self, role: UserRole) -> (UserId, String) {
        let email = format!("test-{}@example.com", Uuid::new_v4().simple());
        let user = AuthService::new(&self.pool)
            .register("Test User", &email, TEST_PASSWORD, role)
            .await
            .unwrap();
        (user.id, email)
    }

    /// Add a review with the given status by a fresh user.
    pub async fn add_review(&self, product_id: ProductId, stars: i64, status: ReviewStatus) {
        let (user_id, _) = self.create_user(UserRole::Customer).await;
        let reviews = ReviewRepository::new(&self.pool);
        let review = reviews
            .create(product_id, user_id, Rating::new(stars).unwrap(), None)
            .await
            .unwrap();
        if status != ReviewStatus::Pending {
            reviews.set_status(review.id, status).await.unwrap();
        }
    }

    /// Log this context's client in.
    pub async fn login(&self, email: &str) -> Value {
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": TEST_PASSWORD }))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success(), "login failed: {}", resp.status());
        resp.json().await.unwrap()
    }
}

/// A complete shipping address.
#[must_use]
pub fn shipping_address() -> Value {
    json!({
        "name": "Ayesha Khan",
        "phone": "03001234567",
        "address": "12 Canal Road",
        "city": "Lahore"
    })
}
