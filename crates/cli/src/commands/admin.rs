//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! bazaar-cli admin create -e admin@example.com -n "Admin Name" -p 's3cret!!'
//! ```

use thiserror::Error;

use bazaar_api::db::{RepositoryError, UserRepository};
use bazaar_api::services::auth::{AuthError, hash_password};
use bazaar_core::UserId;
use bazaar_core::user::{RegisterRequest, UserInputError};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Name, email or password failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] UserInputError),

    /// User already exists.
    #[error("User already exists with email: {0}")]
    UserExists(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Create a new admin user.
///
/// # Arguments
///
/// * `email` - Admin's email address
/// * `name` - Admin's display name
/// * `password` - Admin's password
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns an error if the input is invalid, the email is taken, or the
/// database is unreachable.
pub async fn create_user(
    email: &str,
    name: &str,
    password: &str,
) -> Result<UserId, Box<dyn std::error::Error>> {
    let request = RegisterRequest {
        name: name.to_owned(),
        email: email.to_owned(),
        password: password.to_owned(),
    };
    let registration = request.validate().map_err(AdminError::from)?;

    let pool = super::connect().await?;
    let users = UserRepository::new(&pool);

    tracing::info!("Creating admin user: {}", registration.email);

    let password_hash = hash_password(registration.password).map_err(AdminError::from)?;
    let user = users
        .create(registration.name, &registration.email, &password_hash, true)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AdminError::UserExists(email.to_owned()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );

    Ok(user.id)
}
