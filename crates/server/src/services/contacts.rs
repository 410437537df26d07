//! Shipping contacts: validation and CRUD.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use sqlx::PgPool;

use procura_core::{ContactId, Phone, UserId};

use super::{FieldError, ServiceError};
use crate::db::{ContactRepository, RepositoryError};
use crate::models::{Contact, ContactInput, NewContact};

/// Letters (Latin or Cyrillic), spaces and hyphens.
static CITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Zа-яА-ЯёЁ\- ]+$").expect("Invalid regex"));

fn required_field(
    field: &'static str,
    value: Option<String>,
    max: usize,
) -> Result<String, FieldError> {
    let value = value.map(|v| v.trim().to_owned()).unwrap_or_default();
    if value.is_empty() {
        return Err(FieldError::new(field, Value::Null, "field is required"));
    }
    check_length(field, value, max)
}

fn optional_field(
    field: &'static str,
    value: Option<String>,
    max: usize,
) -> Result<String, FieldError> {
    let value = value.map(|v| v.trim().to_owned()).unwrap_or_default();
    check_length(field, value, max)
}

fn check_length(field: &'static str, value: String, max: usize) -> Result<String, FieldError> {
    if value.chars().count() > max {
        return Err(FieldError::new(
            field,
            value,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(value)
}

/// Validate a posted contact.
///
/// # Errors
///
/// Returns a [`FieldError`] naming the first invalid field.
pub fn validate_contact(input: ContactInput) -> Result<NewContact, FieldError> {
    let city = required_field("city", input.city, 50)?;
    if !CITY_RE.is_match(&city) {
        return Err(FieldError::new(
            "city",
            city,
            "city may contain only letters, spaces and hyphens",
        ));
    }

    let street = required_field("street", input.street, 100)?;
    let house = required_field("house", input.house, 15)?;
    let structure = optional_field("structure", input.structure, 15)?;
    let building = optional_field("building", input.building, 15)?;
    let apartment = optional_field("apartment", input.apartment, 15)?;

    let raw_phone = required_field("phone", input.phone, Phone::MAX_LENGTH)?;
    let phone = Phone::parse(&raw_phone)
        .map_err(|e| FieldError::new("phone", raw_phone.as_str(), e.to_string()))?;

    Ok(NewContact {
        city,
        street,
        house,
        structure,
        building,
        apartment,
        phone,
    })
}

fn phone_conflict(err: RepositoryError, contact: &NewContact) -> ServiceError {
    match err {
        RepositoryError::Conflict(_) => FieldError::new(
            "phone",
            contact.phone.as_str(),
            "phone is already registered",
        )
        .into(),
        other => other.into(),
    }
}

/// Contact operations for the calling user.
pub struct ContactService<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's contacts.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Contact>, ServiceError> {
        Ok(ContactRepository::new(self.pool).list_for_user(user_id).await?)
    }

    /// Validate and store a new contact.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for invalid fields or a phone that
    /// is already registered.
    pub async fn create(
        &self,
        user_id: UserId,
        input: ContactInput,
    ) -> Result<Contact, ServiceError> {
        let contact = validate_contact(input)?;
        match ContactRepository::new(self.pool).create(user_id, &contact).await {
            Ok(created) => {
                tracing::info!(contact_id = %created.id, user_id = %user_id, "Contact created");
                Ok(created)
            }
            Err(e) => Err(phone_conflict(e, &contact)),
        }
    }

    /// Validate and store new values for one of the user's contacts.
    ///
    /// With `partial`, fields missing from `input` keep their stored values;
    /// otherwise the payload must carry every required field.
    ///
    /// # Errors
    ///
    /// - `ServiceError::NotFound` if the user has no such contact
    /// - `ServiceError::Validation` for invalid fields or a phone registered
    ///   to another contact
    pub async fn update(
        &self,
        user_id: UserId,
        id: ContactId,
        input: ContactInput,
        partial: bool,
    ) -> Result<Contact, ServiceError> {
        let repo = ContactRepository::new(self.pool);
        let input = if partial {
            let stored = repo
                .get(user_id, id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("contact {id}")))?;
            input.or_stored(&stored)
        } else {
            input
        };

        let contact = validate_contact(input)?;
        match repo.update(user_id, id, &contact).await {
            Ok(updated) => {
                tracing::info!(contact_id = %id, user_id = %user_id, "Contact updated");
                Ok(updated)
            }
            Err(RepositoryError::NotFound) => Err(ServiceError::NotFound(format!("contact {id}"))),
            Err(e) => Err(phone_conflict(e, &contact)),
        }
    }

    /// Delete one of the user's contacts.
    ///
    /// # Errors
    ///
    /// - `ServiceError::NotFound` if the user has no such contact
    /// - `ServiceError::Validation` if an order still references it
    pub async fn delete(&self, user_id: UserId, id: ContactId) -> Result<(), ServiceError> {
        match ContactRepository::new(self.pool).delete(user_id, id).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(ServiceError::NotFound(format!("contact {id}"))),
            Err(RepositoryError::Conflict(_)) => {
                Err(FieldError::new("id", id.as_i32(), "contact is in use").into())
            }
            Err(e) => Err(e.into()),
        }
    }
}
