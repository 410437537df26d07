//! HTTP route handlers for the JSON API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness
//! GET  /health/ready               - Readiness (database reachable)
//!
//! # API (under /api/v1, `Authorization: Token <key>` unless noted)
//! GET    /basket                   - Current basket with total
//! POST   /basket                   - Add items (creates the basket)
//! PUT    /basket                   - Update item quantities
//! DELETE /basket                   - Remove items by id
//!
//! GET  /order                      - Orders past the basket stage
//! POST /order                      - Checkout basket -> new
//! POST /order/confirm              - new -> confirmed (confirmation token)
//! POST /order/assemble             - confirmed -> assembled
//! POST /order/send                 - assembled -> sent
//! POST /order/deliver              - sent -> delivered
//! POST /order/cancel               - new -> canceled
//!
//! GET  /partner/orders             - Orders with the caller shop's items
//! GET  /partner/state              - Whether the caller's shop accepts orders
//! POST /partner/state              - Toggle it
//!
//! GET  /products                   - Product infos (?shop_id=&category_id=), public
//! GET  /shops                      - Shops, public
//! GET  /categories                 - Categories, public
//!
//! GET    /user/contact             - Caller's contacts
//! POST   /user/contact             - Create a contact
//! PUT    /user/contact/{id}        - Replace a contact
//! PATCH  /user/contact/{id}        - Change some contact fields
//! DELETE /user/contact/{id}        - Delete a contact
//!
//! GET       /user/details          - Caller's account
//! PUT|PATCH /user/details          - Update name, company, position
//! ```

pub mod basket;
pub mod catalog;
pub mod contacts;
pub mod orders;
pub mod partner;
pub mod profile;

use axum::{
    Json, Router,
    extract::{FromRequest, Request, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::AppError;
use crate::state::AppState;

/// Prefix all API routes are nested under.
pub const API_PREFIX: &str = "/api/v1";

/// Create the full router (health checks plus the nested API).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest(API_PREFIX, api_routes())
}

/// Create the `/api/v1` router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/basket",
            get(basket::get_basket)
                .post(basket::add_items)
                .put(basket::update_items)
                .delete(basket::remove_items),
        )
        .route("/order", get(orders::list_orders).post(orders::checkout))
        .route("/order/confirm", post(orders::confirm))
        .route("/order/assemble", post(orders::assemble))
        .route("/order/send", post(orders::send))
        .route("/order/deliver", post(orders::deliver))
        .route("/order/cancel", post(orders::cancel))
        .route("/partner/orders", get(partner::list_orders))
        .route(
            "/partner/state",
            get(partner::get_state).post(partner::set_state),
        )
        .route("/products", get(catalog::list_products))
        .route("/shops", get(catalog::list_shops))
        .route("/categories", get(catalog::list_categories))
        .route(
            "/user/contact",
            get(contacts::list_contacts).post(contacts::create_contact),
        )
        .route(
            "/user/contact/{id}",
            put(contacts::replace_contact)
                .patch(contacts::patch_contact)
                .delete(contacts::delete_contact),
        )
        .route(
            "/user/details",
            get(profile::get_details)
                .put(profile::update_details)
                .patch(profile::update_details),
        )
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// JSON body extractor whose rejections use the API error envelope.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Success body: `{"status": true, <key>: <value>}`.
pub fn success(key: &str, value: impl Serialize) -> Json<Value> {
    let mut body = json!({ "status": true });
    body[key] = json!(value);
    Json(body)
}
