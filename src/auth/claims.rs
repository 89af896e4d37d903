//! Session token claims (RFC 7519 subset).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Payload of a session token: the account identifier and the validity
/// window, nothing else.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject: account id as a UUID string.
    pub sub: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp).
    pub iat: i64,
}

impl Claims {
    pub fn new(account_id: Uuid, ttl_seconds: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: account_id.to_string(),
            exp: now + ttl_seconds,
            iat: now,
        }
    }

    /// Extract the account id from the subject claim.
    pub fn account_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Internal("invalid account id in token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_carry_subject_and_window() {
        let account_id = Uuid::new_v4();
        let claims = Claims::new(account_id, 3600);

        assert_eq!(claims.sub, account_id.to_string());
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn account_id_round_trips() {
        let account_id = Uuid::new_v4();
        let claims = Claims::new(account_id, 3600);
        assert_eq!(claims.account_id().unwrap(), account_id);
    }

    #[test]
    fn garbage_subject_is_an_error() {
        let mut claims = Claims::new(Uuid::new_v4(), 3600);
        claims.sub = "not-a-uuid".to_string();
        assert!(claims.account_id().is_err());
    }
}
