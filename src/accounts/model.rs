use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of access levels gating authorization decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Creator,
    Admin,
    Manager,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Creator => "creator",
            Role::Admin => "admin",
            Role::Manager => "manager",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "creator" => Some(Role::Creator),
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            _ => None,
        }
    }
}

/// The durable identity record. Owned exclusively by the account store;
/// `password_digest` never leaves this crate.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    /// Unique, case-insensitive identity key (stored lowercased).
    pub email: String,
    pub name: String,
    /// Bcrypt digest; replaced wholesale on password change, never
    /// partially mutated.
    pub password_digest: String,
    pub role: Role,
    /// Transitions false -> true exactly once, never reversed.
    pub verified: bool,
    /// Digest of an outstanding email-verification token; present only
    /// while `verified` is false and a token has been issued.
    pub verification_token_digest: Option<String>,
    /// Both present or both absent; cleared together on consumption.
    pub reset_token_digest: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied at registration time; everything else is assigned by
/// the store.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub name: String,
    pub password_digest: String,
    pub verification_token_digest: Option<String>,
}

/// The authenticated identity attached to a request after successful
/// session validation. Deliberately excludes every secret-bearing field.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub verified: bool,
}

impl From<&Account> for Principal {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            name: account.name.clone(),
            role: account.role,
            verified: account.verified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_defaults_to_user() {
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::User, Role::Creator, Role::Admin, Role::Manager] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("root"), None);
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Manager).unwrap(), "\"manager\"");
    }

    #[test]
    fn principal_carries_no_secrets() {
        let account = Account {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            password_digest: "$2b$12$abcdefghijklmnopqrstuv".to_string(),
            role: Role::User,
            verified: true,
            verification_token_digest: None,
            reset_token_digest: Some("deadbeef".to_string()),
            reset_token_expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let principal = Principal::from(&account);
        let json = serde_json::to_string(&principal).unwrap();

        assert!(!json.contains("digest"));
        assert!(!json.contains("$2b$"));
        assert!(!json.contains("deadbeef"));
        assert!(json.contains("alice@example.com"));
    }
}
