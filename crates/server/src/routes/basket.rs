//! Basket route handlers.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use procura_core::ContactId;

use super::{ApiJson, success};
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::services::{BasketService, FieldError, required_id};
use crate::state::AppState;

/// Response header carrying the number of removed items.
pub const REMOVED_COUNT_HEADER: HeaderName = HeaderName::from_static("x-removed-count");

/// `POST /basket` body.
#[derive(Debug, Deserialize)]
pub struct AddItemsRequest {
    pub contact_id: Option<Value>,
    pub items: Option<Value>,
}

/// `PUT /basket` body.
#[derive(Debug, Deserialize)]
pub struct UpdateItemsRequest {
    pub items: Option<Value>,
}

/// `DELETE /basket` body or query.
#[derive(Debug, Deserialize)]
pub struct RemoveItemsRequest {
    pub ids: Option<Value>,
}

/// `DELETE /basket?ids=1,2,3`.
#[derive(Debug, Deserialize)]
pub struct IdsQuery {
    pub ids: Option<String>,
}

/// Accept `items` as a JSON array or as a string holding one.
fn items_array(items: Option<Value>) -> std::result::Result<Vec<Value>, FieldError> {
    match items {
        Some(Value::Array(items)) => Ok(items),
        Some(Value::String(encoded)) => match serde_json::from_str::<Value>(&encoded) {
            Ok(Value::Array(items)) => Ok(items),
            _ => Err(FieldError::new("items", encoded, "items must be a JSON array")),
        },
        Some(other) => Err(FieldError::new("items", other, "items must be a JSON array")),
        None => Err(FieldError::new("items", Value::Null, "field is required")),
    }
}

/// Get the caller's basket.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_basket(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Value>> {
    let basket = BasketService::new(state.pool()).get_basket(user.id).await?;
    Ok(success("basket", basket))
}

/// Add items to the caller's basket.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn add_items(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(body): ApiJson<AddItemsRequest>,
) -> Result<Response> {
    let contact_id: ContactId = required_id("contact_id", body.contact_id.as_ref())?;
    let items = items_array(body.items)?;

    let outcome = BasketService::new(state.pool())
        .add_items(user.id, contact_id, &items)
        .await?;

    let Json(mut body) = success("created", outcome.created);
    body["order_id"] = outcome.order_id.as_i32().into();
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// Update quantities in the caller's basket.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_items(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(body): ApiJson<UpdateItemsRequest>,
) -> Result<Json<Value>> {
    let items = items_array(body.items)?;
    let updated = BasketService::new(state.pool())
        .update_items(user.id, &items)
        .await?;
    Ok(success("updated", updated))
}

/// Remove items from the caller's basket.
///
/// Ids come from the JSON body or, for clients that cannot send a body with
/// `DELETE`, from the `ids` query parameter.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn remove_items(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(query): Query<IdsQuery>,
    body: Bytes,
) -> Result<Response> {
    let from_body = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        serde_json::from_slice::<RemoveItemsRequest>(&body)
            .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {e}")))?
            .ids
    };
    let ids = from_body
        .or_else(|| query.ids.map(Value::String))
        .ok_or_else(|| FieldError::new("ids", Value::Null, "field is required"))?;

    let outcome = BasketService::new(state.pool())
        .remove_items(user.id, &ids)
        .await?;

    Ok((
        StatusCode::NO_CONTENT,
        [(REMOVED_COUNT_HEADER, HeaderValue::from(outcome.removed))],
    )
        .into_response())
}
