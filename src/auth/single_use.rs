//! Single-use opaque tokens for the password-reset and email-verification
//! flows.
//!
//! The plaintext token is a high-entropy random value handed to the client
//! exactly once, out-of-band; only its SHA-256 digest is ever persisted.
//! SHA-256 is deliberate: these tokens resist guessing through entropy, not
//! hashing cost, so the slow password hash would buy nothing. Consumption
//! goes through the store's atomic conditional updates, so a token can be
//! spent at most once no matter how many requests race for it.

use chrono::{Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};

use crate::accounts::{Account, AccountStore};
use crate::auth::password::hash_password;
use crate::error::AppError;

/// Reset tokens are valid for ten minutes from issuance.
const RESET_TOKEN_TTL_MINUTES: i64 = 10;

/// 40 alphanumeric characters, ~238 bits of entropy from the thread-local
/// CSPRNG.
const TOKEN_LENGTH: usize = 40;

/// Generate a fresh opaque token. The return value is the only copy of
/// the plaintext; callers hand it to the mailer and drop it.
pub fn generate_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Irreversible digest stored in place of the plaintext token.
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Issue a password-reset token for an account: persist digest + expiry,
/// return the plaintext for out-of-band delivery.
pub async fn issue_reset(
    store: &dyn AccountStore,
    account: &Account,
) -> Result<String, AppError> {
    let token = generate_token();
    let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);

    store
        .set_reset_token(account.id, &token_digest(&token), expires_at)
        .await?;

    tracing::info!(account_id = %account.id, "Password reset token issued");
    Ok(token)
}

/// Consume a reset token and install the new password.
///
/// Wrong token, already-consumed token, and expired token are
/// indistinguishable to the caller.
pub async fn consume_reset(
    store: &dyn AccountStore,
    token: &str,
    new_password: &str,
) -> Result<Account, AppError> {
    let new_digest = hash_password(new_password)?;

    let account = store
        .consume_reset_token(&token_digest(token), Utc::now(), &new_digest)
        .await?
        .ok_or(AppError::InvalidOrExpiredToken)?;

    tracing::info!(account_id = %account.id, "Password reset completed");
    Ok(account)
}

/// Issue an email-verification token. Verification tokens carry no expiry.
pub async fn issue_verification(
    store: &dyn AccountStore,
    account: &Account,
) -> Result<String, AppError> {
    let token = generate_token();

    store
        .set_verification_token(account.id, &token_digest(&token))
        .await?;

    tracing::info!(account_id = %account.id, "Email verification token issued");
    Ok(token)
}

/// Consume a verification token, flipping `verified` false -> true.
///
/// An account that is already verified yields `AlreadyVerified`; so does
/// losing a consumption race, since the winner flipped the flag first.
pub async fn consume_verification(
    store: &dyn AccountStore,
    token: &str,
) -> Result<Account, AppError> {
    let digest = token_digest(token);

    let account = store
        .find_by_verification_digest(&digest)
        .await?
        .ok_or(AppError::InvalidOrExpiredToken)?;

    if account.verified {
        return Err(AppError::AlreadyVerified);
    }

    let account = store
        .consume_verification_token(&digest)
        .await?
        .ok_or(AppError::AlreadyVerified)?;

    tracing::info!(account_id = %account.id, "Email verified");
    Ok(account)
}
