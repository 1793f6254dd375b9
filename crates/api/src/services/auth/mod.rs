//! Authentication service.
//!
//! Provides password registration and login, profile updates, and the
//! argon2 hashing used for every stored password.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use tracing::info;

use bazaar_core::user::{LoginRequest, ProfileUpdate, RegisterRequest, UserInfo};
use bazaar_core::{Email, UserId};

use crate::db::RepositoryError;
use crate::db::users::{UserChanges, UserRepository};
use crate::models::User;
use crate::services::token::TokenSigner;

/// Authentication service.
///
/// Handles user registration, login, and self-service profile changes.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: &'a TokenSigner,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, tokens: &'a TokenSigner) -> Self {
        Self {
            users: UserRepository::new(pool),
            tokens,
        }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new (non-admin) user and issue a token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidInput` if a field fails validation.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserInfo, AuthError> {
        let registration = request.validate()?;

        if self.users.get_by_email(&registration.email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(registration.password)?;

        // The unique index catches a concurrent registration that slipped
        // past the pre-check.
        let user = self
            .users
            .create(registration.name, &registration.email, &password_hash, false)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        info!(user_id = %user.id, "User registered");
        self.with_token(user)
    }

    /// Login with email and password and issue a token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, request: &LoginRequest) -> Result<UserInfo, AuthError> {
        let email = Email::parse(&request.email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(&request.password, &password_hash)?;

        self.with_token(user)
    }

    /// Apply a self-service profile update and issue a fresh token.
    ///
    /// The password is re-hashed only when a new one is supplied.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidInput` if a supplied field is invalid.
    /// Returns `AuthError::UserAlreadyExists` if the new email is taken.
    /// Returns `AuthError::UserNotFound` if the account no longer exists.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> Result<UserInfo, AuthError> {
        let email = update.email()?;
        let password_hash = update.password()?.map(hash_password).transpose()?;

        let changes = UserChanges {
            name: update.name(),
            email: email.as_ref(),
            password_hash: password_hash.as_deref(),
            is_admin: None,
        };

        let user = self
            .users
            .update(user_id, &changes)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?
            .ok_or(AuthError::UserNotFound)?;

        self.with_token(user)
    }

    fn with_token(&self, user: User) -> Result<UserInfo, AuthError> {
        let token = self.tokens.issue(user.id)?;
        Ok(UserInfo::new(user.into(), token))
    }
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("123456").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("123456", &hash).is_ok());
    }

    #[test]
    fn test_wrong_password_is_invalid_credentials() {
        let hash = hash_password("123456").unwrap();
        assert!(matches!(
            verify_password("654321", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_corrupt_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("123456", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(
            hash_password("123456").unwrap(),
            hash_password("123456").unwrap()
        );
    }
}
