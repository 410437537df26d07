//! Order route handlers: checkout, confirmation and fulfillment steps.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use procura_core::{ContactId, Email, OrderId, OrderState, UserId};

use super::{ApiJson, success};
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::services::orders::Confirmation;
use crate::services::{FieldError, OrderService, required_id};
use crate::state::AppState;

/// `POST /order` body.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub id: Option<Value>,
    pub contact: Option<Value>,
}

/// `POST /order/confirm` body.
#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub email: Option<String>,
    pub token: Option<String>,
    pub order_id: Option<Value>,
    pub contact_id: Option<Value>,
}

/// Body of the fulfillment steps.
#[derive(Debug, Deserialize)]
pub struct OrderIdRequest {
    pub order_id: Option<Value>,
}

fn service(state: &AppState) -> OrderService<'_> {
    OrderService::new(state.pool(), state.notifications(), state.tokens())
}

/// List the caller's orders.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_orders(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Value>> {
    let orders = service(&state).list_orders(user.id).await?;
    Ok(success("orders", orders))
}

/// Check out the caller's basket.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(body): ApiJson<CheckoutRequest>,
) -> Result<Response> {
    let order_id: OrderId = required_id("id", body.id.as_ref())?;
    let contact_id: ContactId = required_id("contact", body.contact.as_ref())?;

    let order = service(&state).checkout(&user, order_id, contact_id).await?;
    Ok((StatusCode::CREATED, success("order", order)).into_response())
}

/// Confirm a checked-out order with its confirmation token.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn confirm(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(body): ApiJson<ConfirmRequest>,
) -> Result<Json<Value>> {
    let raw_email = body
        .email
        .ok_or_else(|| FieldError::new("email", Value::Null, "field is required"))?;
    let email = Email::parse(&raw_email)
        .map_err(|e| FieldError::new("email", raw_email.as_str(), e.to_string()))?;
    let token = body
        .token
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| FieldError::new("token", Value::Null, "field is required"))?;

    let confirmation = Confirmation {
        email,
        token,
        order_id: required_id("order_id", body.order_id.as_ref())?,
        contact_id: required_id("contact_id", body.contact_id.as_ref())?,
    };

    let order = service(&state).confirm(&user, &confirmation).await?;
    Ok(success("order", order))
}

async fn step(
    state: &AppState,
    user_id: UserId,
    body: OrderIdRequest,
    from: OrderState,
    to: OrderState,
) -> Result<Json<Value>> {
    let order_id: OrderId = required_id("order_id", body.order_id.as_ref())?;
    let order = service(state).transition(order_id, user_id, from, to).await?;
    Ok(success("order", order))
}

/// `confirmed -> assembled`.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn assemble(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(body): ApiJson<OrderIdRequest>,
) -> Result<Json<Value>> {
    step(&state, user.id, body, OrderState::Confirmed, OrderState::Assembled).await
}

/// `assembled -> sent`.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn send(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(body): ApiJson<OrderIdRequest>,
) -> Result<Json<Value>> {
    step(&state, user.id, body, OrderState::Assembled, OrderState::Sent).await
}

/// `sent -> delivered`.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn deliver(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(body): ApiJson<OrderIdRequest>,
) -> Result<Json<Value>> {
    step(&state, user.id, body, OrderState::Sent, OrderState::Delivered).await
}

/// `new -> canceled`.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(body): ApiJson<OrderIdRequest>,
) -> Result<Json<Value>> {
    step(&state, user.id, body, OrderState::New, OrderState::Canceled).await
}
