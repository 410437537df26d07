//! User account commands.
//!
//! Accounts created here are active immediately and receive one API token,
//! which is printed so it can be handed to the client.

use procura_core::{Email, UserType};
use procura_server::db::{RepositoryError, UserRepository};
use procura_server::models::NewUser;

use super::{CommandError, connect};

/// Errors that can occur during user operations.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    /// Invalid account type.
    #[error("Invalid user type: {0}. Valid types: buyer, shop")]
    InvalidType(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// User already exists.
    #[error("User already exists with email: {0}")]
    UserExists(String),

    #[error("Database error: {0}")]
    Repository(RepositoryError),
}

/// Generate a 32-character hex token key.
fn generate_token_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Create an active user and return a freshly issued token key.
pub async fn create(email: &str, user_type: &str) -> Result<String, UserError> {
    let user_type: UserType = user_type
        .parse()
        .map_err(|_| UserError::InvalidType(user_type.to_owned()))?;
    let email = Email::parse(email).map_err(|e| UserError::InvalidEmail(e.to_string()))?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    tracing::info!("Creating user: {} ({})", email, user_type);
    let user = users
        .create(&NewUser::active(email.clone(), user_type))
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => UserError::UserExists(email.to_string()),
            other => UserError::Repository(other),
        })?;

    let key = generate_token_key();
    users
        .insert_token(user.id, &key)
        .await
        .map_err(UserError::Repository)?;

    tracing::info!("User created successfully! ID: {}, Email: {}", user.id, email);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_key_shape() {
        let key = generate_token_key();
        assert_eq!(key.len(), 32);
        assert!(key.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_ne!(key, generate_token_key());
    }
}
