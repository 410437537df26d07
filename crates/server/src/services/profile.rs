//! The caller's own account profile.

use sqlx::PgPool;

use procura_core::UserId;

use super::{FieldError, ServiceError};
use crate::db::{RepositoryError, UserRepository};
use crate::models::{ProfileUpdate, User};

const NAME_MAX: usize = 150;
const COMPANY_MAX: usize = 40;

fn trimmed(
    field: &'static str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, FieldError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let value = value.trim().to_owned();
    if value.chars().count() > max {
        return Err(FieldError::new(
            field,
            value,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(Some(value))
}

/// Trim and length-check every field present in a profile update.
///
/// # Errors
///
/// Returns a [`FieldError`] naming the first over-long field.
pub fn validate_profile(update: ProfileUpdate) -> Result<ProfileUpdate, FieldError> {
    Ok(ProfileUpdate {
        first_name: trimmed("first_name", update.first_name, NAME_MAX)?,
        last_name: trimmed("last_name", update.last_name, NAME_MAX)?,
        company: trimmed("company", update.company, COMPANY_MAX)?,
        position: trimmed("position", update.position, COMPANY_MAX)?,
    })
}

/// Profile reads and edits for the calling user.
pub struct ProfileService<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Validate and apply a profile update.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` if a field is too long
    /// - `ServiceError::NotFound` if the account no longer exists
    #[tracing::instrument(skip_all, fields(user_id = %user_id))]
    pub async fn update(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, ServiceError> {
        let update = validate_profile(update)?;
        match UserRepository::new(self.pool).update_profile(user_id, &update).await {
            Ok(user) => {
                tracing::info!("Profile updated");
                Ok(user)
            }
            Err(RepositoryError::NotFound) => {
                Err(ServiceError::NotFound(format!("user {user_id}")))
            }
            Err(e) => Err(e.into()),
        }
    }
}
