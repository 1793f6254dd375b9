//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};

use bazaar_core::{Email, UserId, user::UserProfile};

/// A stored account (domain type).
///
/// The password hash is loaded separately and only for login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// User's email address (normalized).
    pub email: Email,
    /// Whether the user may call admin-only routes.
    pub is_admin: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The client-facing view of this user.
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

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            is_admin: user.is_admin,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_drops_timestamps() {
        let now = Utc::now();
        let user = User {
            id: UserId::new(3),
            name: "Admin User".to_owned(),
            email: Email::parse("admin@example.com").unwrap(),
            is_admin: true,
            created_at: now,
            updated_at: now,
        };
        let profile = user.profile();
        assert_eq!(profile, UserProfile::from(user));
        assert_eq!(profile.id, UserId::new(3));
        assert!(profile.is_admin);
    }
}
