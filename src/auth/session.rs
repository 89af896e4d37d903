//! Session token issuance and validation.
//!
//! Tokens are stateless HS256 JWTs: no server-side session table, so
//! logout is a client-side discard and a token stays valid until its
//! natural expiry. Issuance and validation share one `AuthSettings`, so
//! they can never disagree about the secret or the TTL.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::configuration::AuthSettings;
use crate::error::AppError;

/// Issue a signed session token embedding the account id, valid for the
/// configured TTL.
pub fn issue_session_token(account_id: Uuid, config: &AuthSettings) -> Result<String, AppError> {
    let claims = Claims::new(account_id, config.session_ttl_seconds);

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("session token generation failed: {}", e)))
}

/// Verify signature and expiry, returning the embedded claims.
///
/// Every failure mode (bad signature, malformed token, past expiry)
/// collapses into `Unauthenticated`; the caller learns nothing about
/// which check failed.
pub fn validate_session_token(token: &str, config: &AuthSettings) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Expiry is exact: a token is good one second before its deadline
    // and rejected the moment it passes.
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("session token validation failed: {}", e);
        AppError::Unauthenticated
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AuthSettings {
        AuthSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            session_ttl_seconds: 3600,
            cookie_auth: false,
            email_verification: false,
            secure_cookies: false,
        }
    }

    #[test]
    fn issue_then_validate_recovers_account_id() {
        let config = test_config();
        let account_id = Uuid::new_v4();

        let token = issue_session_token(account_id, &config).expect("failed to issue");
        let claims = validate_session_token(&token, &config).expect("failed to validate");

        assert_eq!(claims.account_id().unwrap(), account_id);
    }

    #[test]
    fn garbage_token_is_rejected() {
        let config = test_config();
        let result = validate_session_token("invalid.token.here", &config);
        assert!(matches!(result, Err(AppError::Unauthenticated)));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let config = test_config();
        let token = issue_session_token(Uuid::new_v4(), &config).unwrap();

        let tampered = format!("{}X", token);
        assert!(validate_session_token(&tampered, &config).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let config = test_config();
        let token = issue_session_token(Uuid::new_v4(), &config).unwrap();

        let mut other = test_config();
        other.secret = "another-secret-key-at-least-32-characters".to_string();
        assert!(validate_session_token(&token, &other).is_err());
    }

    #[test]
    fn token_just_inside_its_ttl_is_accepted() {
        let mut config = test_config();
        config.session_ttl_seconds = 1;

        let token = issue_session_token(Uuid::new_v4(), &config).unwrap();
        assert!(validate_session_token(&token, &config).is_ok());
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = test_config();

        // Forge claims whose expiry is already in the past.
        let mut claims = Claims::new(Uuid::new_v4(), 3600);
        claims.exp = chrono::Utc::now().timestamp() - 5;
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();

        let result = validate_session_token(&token, &config);
        assert!(matches!(result, Err(AppError::Unauthenticated)));
    }
}
