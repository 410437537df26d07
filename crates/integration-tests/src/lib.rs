//! Integration tests for Procura.
//!
//! # Running Tests
//!
//! ```bash
//! export DATABASE_URL=postgres://localhost/procura_test
//! cargo test -p procura-integration-tests -- --ignored
//! ```
//!
//! Each test gets a fresh database from `#[sqlx::test]` with the server
//! migrations applied. Requests go through the real router via
//! `tower::ServiceExt::oneshot`, so no server process is needed.
//!
//! # Test Categories
//!
//! - `basket` - Basket lifecycle through the service layer
//! - `orders` - State machine transitions, checkout and confirmation
//! - `http_api` - Routes, status codes and response bodies

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

use procura_core::{CategoryId, ContactId, Email, ProductInfoId, ShopId, UserType};
use procura_server::config::ServerConfig;
use procura_server::db::{ContactRepository, UserRepository};
use procura_server::models::{ContactInput, NewUser, User};
use procura_server::services::contacts::validate_contact;
use procura_server::services::{NotificationDispatcher, NotificationQueue};
use procura_server::state::AppState;

/// Confirmation key used by every test state.
pub const TEST_SECRET: &str = "q8Z#v2LmR7!tW0pK4@nB9&yF3^cH6*jD";

/// An account with an issued API token.
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    /// `Authorization` header value for this user.
    #[must_use]
    pub fn auth(&self) -> String {
        format!("Token {}", self.token)
    }
}

/// Seeded catalog: one shop, one category, two listings priced 10.00 and 5.00.
pub struct TestCatalog {
    pub shop: ShopId,
    pub category: CategoryId,
    pub listings: [ProductInfoId; 2],
}

/// Server configuration for tests; the database URL is never used because the
/// pool comes from `#[sqlx::test]`.
#[must_use]
pub fn test_config() -> ServerConfig {
    ServerConfig {
        database_url: SecretString::from("postgres://unused"),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        confirmation_secret: SecretString::from(TEST_SECRET),
        notify_queue_capacity: 64,
        catalog_cache_ttl: Duration::from_secs(60),
        sentry: None,
    }
}

/// Build application state over `pool`, returning the event receiver too.
#[must_use]
pub fn test_state(pool: PgPool) -> (AppState, NotificationDispatcher) {
    let config = test_config();
    let (queue, dispatcher) = NotificationQueue::channel(config.notify_queue_capacity);
    let state = AppState::new(config, pool, queue).unwrap();
    (state, dispatcher)
}

/// Create an active user and a token for it.
pub async fn create_user(pool: &PgPool, email: &str, user_type: UserType) -> TestUser {
    let users = UserRepository::new(pool);
    let user = users
        .create(&NewUser::active(Email::parse(email).unwrap(), user_type))
        .await
        .unwrap();
    let token = uuid::Uuid::new_v4().simple().to_string();
    users.insert_token(user.id, &token).await.unwrap();
    TestUser { user, token }
}

/// Create a contact for `user` with the given phone.
pub async fn create_contact(pool: &PgPool, user: &User, phone: &str) -> ContactId {
    let contact = validate_contact(ContactInput {
        city: Some("Moscow".to_owned()),
        street: Some("Tverskaya".to_owned()),
        house: Some("7".to_owned()),
        phone: Some(phone.to_owned()),
        ..ContactInput::default()
    })
    .unwrap();
    ContactRepository::new(pool)
        .create(user.id, &contact)
        .await
        .unwrap()
        .id
}

/// Seed a shop owned by `owner` with two listings.
pub async fn seed_catalog(pool: &PgPool, owner: Option<&User>) -> TestCatalog {
    let shop: ShopId =
        sqlx::query_scalar("INSERT INTO shop (name, user_id) VALUES ('Svyaznoy', $1) RETURNING id")
            .bind(owner.map(|u| u.id))
            .fetch_one(pool)
            .await
            .unwrap();
    let category: CategoryId =
        sqlx::query_scalar("INSERT INTO category (name) VALUES ('Phones') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap();
    sqlx::query("INSERT INTO category_shops (category_id, shop_id) VALUES ($1, $2)")
        .bind(category)
        .bind(shop)
        .execute(pool)
        .await
        .unwrap();

    let mut listings = Vec::with_capacity(2);
    for (external_id, name, price) in [(1, "Phone", "10.00"), (2, "Case", "5.00")] {
        let product: i32 = sqlx::query_scalar(
            "INSERT INTO product (name, category_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(name)
        .bind(category)
        .fetch_one(pool)
        .await
        .unwrap();
        let price: Decimal = price.parse().unwrap();
        let listing: ProductInfoId = sqlx::query_scalar(
            r"
            INSERT INTO product_info (model, external_id, product_id, shop_id, quantity, price, price_rrc)
            VALUES ('m1', $1, $2, $3, 100, $4, $4)
            RETURNING id
            ",
        )
        .bind(external_id)
        .bind(product)
        .bind(shop)
        .bind(price)
        .fetch_one(pool)
        .await
        .unwrap();
        listings.push(listing);
    }

    TestCatalog {
        shop,
        category,
        listings: [listings[0], listings[1]],
    }
}

/// Send a request through the router and decode the body: `Null` when empty,
/// a JSON string for plain-text responses.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, headers, body)
}

/// Build a JSON request, authenticated when `auth` is given.
#[must_use]
pub fn json_request(method: &str, uri: &str, auth: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Build a bodiless request, authenticated when `auth` is given.
#[must_use]
pub fn empty_request(method: &str, uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::empty()).unwrap()
}
