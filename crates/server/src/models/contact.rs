//! Shipping contacts.

use serde::{Deserialize, Serialize};

use procura_core::{ContactId, Phone, UserId};

/// A shipping address with a phone number, owned by one user.
#[derive(Debug, Clone, Serialize)]
pub struct Contact {
    pub id: ContactId,
    #[serde(skip)]
    pub user_id: UserId,
    pub city: String,
    pub street: String,
    pub house: String,
    pub structure: String,
    pub building: String,
    pub apartment: String,
    pub phone: Phone,
}

/// Raw contact payload as posted by clients.
///
/// Only these fields can be set; anything else in the body is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactInput {
    pub city: Option<String>,
    pub street: Option<String>,
    pub house: Option<String>,
    pub structure: Option<String>,
    pub building: Option<String>,
    pub apartment: Option<String>,
    pub phone: Option<String>,
}

impl ContactInput {
    /// Fill the fields this payload omits from a stored contact.
    #[must_use]
    pub fn or_stored(self, stored: &Contact) -> Self {
        Self {
            city: self.city.or_else(|| Some(stored.city.clone())),
            street: self.street.or_else(|| Some(stored.street.clone())),
            house: self.house.or_else(|| Some(stored.house.clone())),
            structure: self.structure.or_else(|| Some(stored.structure.clone())),
            building: self.building.or_else(|| Some(stored.building.clone())),
            apartment: self.apartment.or_else(|| Some(stored.apartment.clone())),
            phone: self.phone.or_else(|| Some(stored.phone.as_str().to_owned())),
        }
    }
}

/// A validated contact ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub city: String,
    pub street: String,
    pub house: String,
    pub structure: String,
    pub building: String,
    pub apartment: String,
    pub phone: Phone,
}
