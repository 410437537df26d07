//! Shop management commands.

use procura_core::Email;
use procura_server::db::{CatalogRepository, RepositoryError, UserRepository};

use super::{CommandError, connect};

/// Errors that can occur during shop operations.
#[derive(Debug, thiserror::Error)]
pub enum ShopError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    /// Invalid owner email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// No account with the owner email.
    #[error("No user with email: {0}")]
    UnknownOwner(String),

    /// The owner is a buyer account.
    #[error("User {0} is not a shop account")]
    NotAShopAccount(String),

    /// The owner already has a shop.
    #[error("User {0} already owns a shop")]
    AlreadyOwned(String),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Create a shop, optionally bound to a partner account.
pub async fn create(
    name: &str,
    url: Option<&str>,
    owner_email: Option<&str>,
) -> Result<(), ShopError> {
    let owner_email = owner_email
        .map(|raw| Email::parse(raw).map_err(|e| ShopError::InvalidEmail(e.to_string())))
        .transpose()?;

    let pool = connect().await?;

    let owner = match &owner_email {
        Some(email) => {
            let user = UserRepository::new(&pool)
                .get_by_email(email)
                .await?
                .ok_or_else(|| ShopError::UnknownOwner(email.to_string()))?;
            if !user.is_shop() {
                return Err(ShopError::NotAShopAccount(email.to_string()));
            }
            Some(user.id)
        }
        None => None,
    };

    let shop = CatalogRepository::new(&pool)
        .create_shop(name, url, owner)
        .await
        .map_err(|e| match (e, &owner_email) {
            (RepositoryError::Conflict(_), Some(email)) => {
                ShopError::AlreadyOwned(email.to_string())
            }
            (other, _) => ShopError::Repository(other),
        })?;

    tracing::info!("Shop created successfully! ID: {}, Name: {}", shop.id, shop.name);
    Ok(())
}
