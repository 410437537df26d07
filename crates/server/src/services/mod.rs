//! Business logic services.
//!
//! # Services
//!
//! - `basket` - Basket item add/update/remove with first-failure-abort batches
//! - `orders` - Order state machine (checkout, confirm, fulfillment steps)
//! - `catalog` - Cached shop/category lists and partner shop state
//! - `contacts` - Shipping contact validation and CRUD
//! - `profile` - The caller's own account profile
//! - `confirmation` - HMAC order confirmation tokens
//! - `notifications` - Outbound order event queue
//!
//! Services borrow what they need from [`crate::state::AppState`] and return
//! [`ServiceError`], which the route layer maps to HTTP responses.

pub mod basket;
pub mod catalog;
pub mod confirmation;
pub mod contacts;
pub mod notifications;
pub mod orders;
pub mod profile;

use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use procura_core::{OrderId, OrderState};

use crate::db::RepositoryError;

pub use basket::BasketService;
pub use catalog::CatalogService;
pub use confirmation::ConfirmationTokens;
pub use contacts::ContactService;
pub use notifications::{NotificationDispatcher, NotificationQueue};
pub use orders::OrderService;
pub use profile::ProfileService;

/// A rejected input field.
///
/// `index` is set for batch operations and points at the offending entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub field: String,
    pub value: serde_json::Value,
    pub message: String,
}

impl FieldError {
    /// Error on a top-level field.
    pub fn new(
        field: impl Into<String>,
        value: impl Into<serde_json::Value>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            index: None,
            field: field.into(),
            value: value.into(),
            message: message.into(),
        }
    }

    /// Attach the position of the entry within a batch.
    #[must_use]
    pub const fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.index {
            Some(index) => write!(f, "items[{index}].{}: {}", self.field, self.message),
            None => write!(f, "{}: {}", self.field, self.message),
        }
    }
}

/// Errors returned by the service layer.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input was rejected; nothing was written.
    #[error("validation failed: {0}")]
    Validation(FieldError),

    /// The entity does not exist or does not belong to the caller.
    #[error("{0} not found")]
    NotFound(String),

    /// The order is not in the state the caller expected.
    #[error("order {order_id} is {current}, expected {expected}")]
    StateConflict {
        order_id: OrderId,
        expected: OrderState,
        current: OrderState,
    },

    /// The caller's account type does not allow this operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Storage failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

impl From<FieldError> for ServiceError {
    fn from(e: FieldError) -> Self {
        Self::Validation(e)
    }
}

/// Read a positive id from a JSON number or digit string.
pub(crate) fn id_from_json<T>(value: &Value) -> Option<T>
where
    T: From<i32> + FromStr,
{
    match value {
        Value::Number(n) => n
            .as_i64()
            .filter(|v| *v > 0)
            .and_then(|v| i32::try_from(v).ok())
            .map(T::from),
        Value::String(s) if s.trim().bytes().all(|b| b.is_ascii_digit()) => s.parse().ok(),
        _ => None,
    }
}

/// Read a required id field from a request body.
///
/// # Errors
///
/// Returns a [`FieldError`] on `field` if the value is absent or not a
/// positive integer.
pub fn required_id<T>(field: &str, value: Option<&Value>) -> Result<T, FieldError>
where
    T: From<i32> + FromStr,
{
    let value = value.unwrap_or(&Value::Null);
    if value.is_null() {
        return Err(FieldError::new(field, Value::Null, "field is required"));
    }
    id_from_json(value)
        .ok_or_else(|| FieldError::new(field, value.clone(), "must be a positive integer id"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_field_error_display() {
        let err = FieldError::new("quantity", "x", "quantity must be a whole number").at(2);
        assert_eq!(
            err.to_string(),
            "items[2].quantity: quantity must be a whole number"
        );
        let err = FieldError::new("ids", "", "no items matched");
        assert_eq!(err.to_string(), "ids: no items matched");
    }

    #[test]
    fn test_required_id() {
        use procura_core::ContactId;
        use serde_json::json;

        assert_eq!(
            required_id::<ContactId>("contact", Some(&json!("12"))),
            Ok(ContactId::new(12))
        );
        assert_eq!(
            required_id::<ContactId>("contact", Some(&json!(12))),
            Ok(ContactId::new(12))
        );
        let err = required_id::<ContactId>("contact", None).unwrap_err();
        assert_eq!(err.message, "field is required");
        let err = required_id::<ContactId>("contact", Some(&json!(1.5))).unwrap_err();
        assert_eq!(err.value, json!(1.5));
        assert!(required_id::<ContactId>("contact", Some(&json!("-3"))).is_err());
    }

    #[test]
    fn test_state_conflict_display() {
        let err = ServiceError::StateConflict {
            order_id: OrderId::new(5),
            expected: OrderState::Confirmed,
            current: OrderState::Sent,
        };
        assert_eq!(err.to_string(), "order 5 is sent, expected confirmed");
    }
}
