//! User accounts and roles.

use crate::audit::{by_created, by_last_modified, AuditStamp, Auditable};
use crate::entity::Entity;
use crate::identifiers::UserId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Authorization role of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Back-office administrator.
    Admin,
    /// Regular shopper.
    Customer,
}

impl Default for Role {
    fn default() -> Self {
        Self::Customer
    }
}

/// A registered user account.
///
/// Password hashing happens in the auth service; this type only stores the
/// resulting hash and salt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier, assigned at creation.
    pub id: UserId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Login name, unique per account.
    pub username: String,
    /// Authorization role.
    pub role: Role,
    /// Contact email.
    pub email: String,
    /// Hash of the user's password.
    pub password_hash: String,
    /// Salt used when hashing.
    pub salt_key: String,
    /// Audit metadata, stamped by the session.
    #[serde(flatten)]
    pub audit: AuditStamp,
}

impl User {
    /// Create a customer account with a fresh identifier.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        salt_key: impl Into<String>,
    ) -> Self {
        Self {
            id: UserId::new(),
            first_name: String::new(),
            last_name: String::new(),
            username: username.into(),
            role: Role::Customer,
            email: email.into(),
            password_hash: password_hash.into(),
            salt_key: salt_key.into(),
            audit: AuditStamp::default(),
        }
    }
}

impl Auditable for User {
    fn audit(&self) -> &AuditStamp {
        &self.audit
    }
    fn audit_mut(&mut self) -> &mut AuditStamp {
        &mut self.audit
    }
}

impl Entity for User {
    const TABLE: &'static str = "users";

    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn compare_by(field: &str, a: &Self, b: &Self) -> Ordering {
        match field.to_ascii_lowercase().as_str() {
            "username" => a.username.to_lowercase().cmp(&b.username.to_lowercase()),
            "email" => a.email.to_lowercase().cmp(&b.email.to_lowercase()),
            "last_modified" | "lastmodified" => by_last_modified(a, b),
            _ => by_created(a, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(
            serde_json::to_string(&Role::Customer).unwrap(),
            "\"customer\""
        );
    }

    #[test]
    fn test_username_sort_is_case_insensitive() {
        let a = User::new("Zoe", "z@example.com", "h", "s");
        let b = User::new("adam", "a@example.com", "h", "s");
        assert_eq!(User::compare_by("username", &a, &b), Ordering::Greater);
    }
}
