//! User domain types.
//!
//! [`User`] is the stored account including its password hash; [`UserProfile`]
//! is the public projection returned to clients.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::{Email, UserId, UserRole};

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Unique across accounts.
    pub email: Email,
    /// Argon2id PHC string. Never leaves the service layer.
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A new customer account.
    #[must_use]
    pub fn new(name: String, email: Email, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::generate(),
            name,
            email,
            password_hash,
            role: UserRole::Customer,
            created_at: now,
            updated_at: now,
        }
    }

    /// The client-visible view of this account.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }
}

/// Public user fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_omits_password_hash() {
        let user = User::new(
            "Ada Lovelace".into(),
            Email::parse("ada@example.com").unwrap(),
            "$argon2id$v=19$...".into(),
        );
        let json = serde_json::to_value(user.profile()).unwrap();

        assert_eq!(json["email"], "ada@example.com");
        assert_eq!(json["role"], "customer");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("created_at").is_some());
    }
}
