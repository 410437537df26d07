//! Database operations for shipping contacts.

use sqlx::PgPool;

use procura_core::{ContactId, Phone, UserId};

use super::RepositoryError;
use crate::models::{Contact, NewContact};

/// Internal row type for `PostgreSQL` contact queries.
#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    id: i32,
    user_id: i32,
    city: String,
    street: String,
    house: String,
    structure: String,
    building: String,
    apartment: String,
    phone: String,
}

impl TryFrom<ContactRow> for Contact {
    type Error = RepositoryError;

    fn try_from(row: ContactRow) -> Result<Self, Self::Error> {
        let phone = Phone::parse(&row.phone).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid phone for contact {}: {e}", row.id))
        })?;

        Ok(Self {
            id: ContactId::new(row.id),
            user_id: UserId::new(row.user_id),
            city: row.city,
            street: row.street,
            house: row.house,
            structure: row.structure,
            building: row.building,
            apartment: row.apartment,
            phone,
        })
    }
}

/// Repository for contact database operations.
pub struct ContactRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepository<'a> {
    /// Create a new contact repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a user's contacts, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Contact>, RepositoryError> {
        let rows = sqlx::query_as::<_, ContactRow>(
            r"
            SELECT id, user_id, city, street, house, structure, building, apartment, phone
            FROM contact
            WHERE user_id = $1
            ORDER BY id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Create a contact for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the phone is already registered.
    /// Returns `RepositoryError::Database` for other failures.
    pub async fn create(
        &self,
        user_id: UserId,
        contact: &NewContact,
    ) -> Result<Contact, RepositoryError> {
        let row = sqlx::query_as::<_, ContactRow>(
            r"
            INSERT INTO contact (user_id, city, street, house, structure, building, apartment, phone)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, city, street, house, structure, building, apartment, phone
            ",
        )
        .bind(user_id)
        .bind(&contact.city)
        .bind(&contact.street)
        .bind(&contact.house)
        .bind(&contact.structure)
        .bind(&contact.building)
        .bind(&contact.apartment)
        .bind(contact.phone.as_str())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "contact with this phone"))?;

        row.try_into()
    }

    /// Get one of a user's contacts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        user_id: UserId,
        id: ContactId,
    ) -> Result<Option<Contact>, RepositoryError> {
        let row = sqlx::query_as::<_, ContactRow>(
            r"
            SELECT id, user_id, city, street, house, structure, building, apartment, phone
            FROM contact
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Replace every field of one of a user's contacts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such contact.
    /// Returns `RepositoryError::Conflict` if the phone belongs to another contact.
    /// Returns `RepositoryError::Database` for other failures.
    pub async fn update(
        &self,
        user_id: UserId,
        id: ContactId,
        contact: &NewContact,
    ) -> Result<Contact, RepositoryError> {
        let row = sqlx::query_as::<_, ContactRow>(
            r"
            UPDATE contact
            SET city = $3, street = $4, house = $5, structure = $6,
                building = $7, apartment = $8, phone = $9
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, city, street, house, structure, building, apartment, phone
            ",
        )
        .bind(id)
        .bind(user_id)
        .bind(&contact.city)
        .bind(&contact.street)
        .bind(&contact.house)
        .bind(&contact.structure)
        .bind(&contact.building)
        .bind(&contact.apartment)
        .bind(contact.phone.as_str())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "contact with this phone"))?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Delete one of a user's contacts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no such contact.
    /// Returns `RepositoryError::Conflict` if an order still references it.
    /// Returns `RepositoryError::Database` for other failures.
    pub async fn delete(&self, user_id: UserId, id: ContactId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM contact WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    RepositoryError::Conflict("contact is in use by an order".to_owned())
                }
                other => RepositoryError::Database(other),
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
