//! Account profile route handlers.

use axum::{Json, extract::State};
use serde_json::Value;

use super::{ApiJson, success};
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::ProfileUpdate;
use crate::services::ProfileService;
use crate::state::AppState;

/// The caller's account.
pub async fn get_details(RequireUser(user): RequireUser) -> Json<Value> {
    success("user", user)
}

/// Update the caller's name, company or position.
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_details(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<Json<Value>> {
    let user = ProfileService::new(state.pool()).update(user.id, update).await?;
    Ok(success("user", user))
}
