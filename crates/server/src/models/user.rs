//! User domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use procura_core::{Email, UserId, UserType};

/// An account: either a buyer or a shop partner.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login email; order confirmation tokens are bound to it.
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub position: String,
    /// Buyer or shop partner.
    #[serde(rename = "type")]
    pub user_type: UserType,
    /// Set once the account email has been confirmed.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether this account represents a shop partner.
    #[must_use]
    pub fn is_shop(&self) -> bool {
        self.user_type == UserType::Shop
    }
}

/// Fields for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub position: String,
    pub user_type: UserType,
    pub is_active: bool,
}

impl NewUser {
    /// An active account with empty profile fields.
    #[must_use]
    pub fn active(email: Email, user_type: UserType) -> Self {
        Self {
            email,
            first_name: String::new(),
            last_name: String::new(),
            company: String::new(),
            position: String::new(),
            user_type,
            is_active: true,
        }
    }
}

/// Profile fields a user may change about themselves.
///
/// Email, account type and activation are not part of this payload; any such
/// keys in a request body are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
}
