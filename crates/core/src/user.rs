//! User accounts and authentication payloads.
//!
//! Password material only ever travels inbound (register, login, profile
//! update). Every outbound shape omits it.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Email, EmailError, UserId};

/// Minimum password length accepted at registration and profile update.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Errors rejecting user-supplied account fields.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UserInputError {
    #[error("Name is required")]
    EmptyName,
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),
    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters")]
    PasswordTooShort,
}

/// A user as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub is_admin: bool,
}

/// A user together with a freshly issued bearer token.
///
/// Returned by register, login, and profile update.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub is_admin: bool,
    pub token: String,
}

impl UserInfo {
    #[must_use]
    pub fn new(profile: UserProfile, token: String) -> Self {
        Self {
            id: profile.id,
            name: profile.name,
            email: profile.email,
            is_admin: profile.is_admin,
            token,
        }
    }

    /// The profile part, without the token.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            is_admin: self.is_admin,
        }
    }
}

impl fmt::Debug for UserInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserInfo")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("is_admin", &self.is_admin)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// `POST /api/users` body.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// A registration that passed field validation.
pub struct Registration<'a> {
    pub name: &'a str,
    pub email: Email,
    pub password: &'a str,
}

impl RegisterRequest {
    /// Validate the submitted fields.
    ///
    /// # Errors
    ///
    /// Returns an error for a blank name, a malformed email, or a short
    /// password.
    pub fn validate(&self) -> Result<Registration<'_>, UserInputError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(UserInputError::EmptyName);
        }
        let email = Email::parse(&self.email)?;
        check_password(&self.password)?;
        Ok(Registration {
            name,
            email,
            password: &self.password,
        })
    }
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// `POST /api/users/login` body.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// `PUT /api/users/profile` body. Missing or empty fields keep their value.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ProfileUpdate {
    /// The new name, if one was supplied.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        non_empty(self.name.as_deref())
    }

    /// The new email, if one was supplied.
    ///
    /// # Errors
    ///
    /// Returns an error when a supplied email is malformed.
    pub fn email(&self) -> Result<Option<Email>, UserInputError> {
        non_empty(self.email.as_deref())
            .map(Email::parse)
            .transpose()
            .map_err(UserInputError::from)
    }

    /// The new password, if one was supplied.
    ///
    /// # Errors
    ///
    /// Returns an error when a supplied password is too short.
    pub fn password(&self) -> Result<Option<&str>, UserInputError> {
        match self.password.as_deref().filter(|p| !p.is_empty()) {
            Some(p) => check_password(p).map(|()| Some(p)),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for ProfileUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileUpdate")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// `PUT /api/users/{id}` body (admin).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

impl AdminUserUpdate {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        non_empty(self.name.as_deref())
    }

    /// # Errors
    ///
    /// Returns an error when a supplied email is malformed.
    pub fn email(&self) -> Result<Option<Email>, UserInputError> {
        non_empty(self.email.as_deref())
            .map(Email::parse)
            .transpose()
            .map_err(UserInputError::from)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn check_password(password: &str) -> Result<(), UserInputError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(UserInputError::PasswordTooShort);
    }
    Ok(())
}
