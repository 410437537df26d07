//! Contact route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use procura_core::ContactId;

use super::{ApiJson, success};
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::ContactInput;
use crate::services::ContactService;
use crate::state::AppState;

/// List the caller's contacts.
pub async fn list_contacts(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Value>> {
    let contacts = ContactService::new(state.pool()).list(user.id).await?;
    Ok(success("results", contacts))
}

/// Create a contact for the caller.
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn create_contact(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(input): ApiJson<ContactInput>,
) -> Result<Response> {
    let contact = ContactService::new(state.pool()).create(user.id, input).await?;
    Ok((StatusCode::CREATED, success("contact", contact)).into_response())
}

fn parse_contact_id(id: &str) -> Result<ContactId> {
    id.parse()
        .map_err(|_| AppError::BadRequest(format!("invalid contact id: {id}")))
}

/// Replace one of the caller's contacts.
#[tracing::instrument(skip_all, fields(user_id = %user.id, contact_id = %id))]
pub async fn replace_contact(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<ContactInput>,
) -> Result<Json<Value>> {
    let id = parse_contact_id(&id)?;
    let contact = ContactService::new(state.pool())
        .update(user.id, id, input, false)
        .await?;
    Ok(success("contact", contact))
}

/// Change some fields of one of the caller's contacts.
#[tracing::instrument(skip_all, fields(user_id = %user.id, contact_id = %id))]
pub async fn patch_contact(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<ContactInput>,
) -> Result<Json<Value>> {
    let id = parse_contact_id(&id)?;
    let contact = ContactService::new(state.pool())
        .update(user.id, id, input, true)
        .await?;
    Ok(success("contact", contact))
}

/// Delete one of the caller's contacts.
#[tracing::instrument(skip_all, fields(user_id = %user.id, contact_id = %id))]
pub async fn delete_contact(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = parse_contact_id(&id)?;
    ContactService::new(state.pool()).delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
