//! Partner (shop) route handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::Value;

use super::{ApiJson, success};
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::services::{CatalogService, FieldError, OrderService};
use crate::state::AppState;

/// `POST /partner/state` body.
#[derive(Debug, Deserialize)]
pub struct PartnerStateRequest {
    pub state: Option<Value>,
}

/// Interpret `true`/`false` or the usual string spellings of a flag.
fn parse_flag(value: Option<Value>) -> std::result::Result<bool, FieldError> {
    match value {
        Some(Value::Bool(flag)) => Ok(flag),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" | "y" | "t" | "1" => Ok(true),
            "false" | "off" | "no" | "n" | "f" | "0" => Ok(false),
            _ => Err(FieldError::new("state", s, "state must be a boolean")),
        },
        Some(Value::Number(n)) if n.as_i64() == Some(0) || n.as_i64() == Some(1) => {
            Ok(n.as_i64() == Some(1))
        }
        Some(other) => Err(FieldError::new("state", other, "state must be a boolean")),
        None => Err(FieldError::new("state", Value::Null, "field is required")),
    }
}

/// Orders containing the caller shop's items.
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_orders(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Value>> {
    let orders = OrderService::new(state.pool(), state.notifications(), state.tokens())
        .partner_orders(&user)
        .await?;
    Ok(success("orders", orders))
}

/// The caller shop's order-acceptance state.
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_state(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Value>> {
    let shop = CatalogService::new(state.pool(), state.catalog_cache())
        .partner_shop(&user)
        .await?;
    Ok(success("shop", shop))
}

/// Toggle whether the caller's shop accepts orders.
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn set_state(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(body): ApiJson<PartnerStateRequest>,
) -> Result<Json<Value>> {
    let flag = parse_flag(body.state)?;
    let shop = CatalogService::new(state.pool(), state.catalog_cache())
        .set_partner_state(&user, flag)
        .await?;
    Ok(success("shop", shop))
}
