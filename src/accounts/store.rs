use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::accounts::{Account, NewAccount};
use crate::error::AppError;

/// Durable home of the [`Account`] record.
///
/// The consume operations are atomic conditional updates: they match on
/// the stored digest (and expiry, where one exists) and clear it in the
/// same step, so two concurrent requests can never both consume one
/// single-use token. Implementations that cannot express this in the
/// backing store must serialize the check-and-clear themselves.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError>;

    /// Creates an account. Fails with `DuplicateIdentity` when the email
    /// is already taken; uniqueness is enforced by the store itself, not
    /// only by the caller's pre-check.
    async fn create(&self, draft: NewAccount) -> Result<Account, AppError>;

    /// Replaces the password digest wholesale.
    async fn set_password(&self, id: Uuid, digest: &str) -> Result<(), AppError>;

    /// Records an outstanding reset token; digest and expiry are written
    /// together so one is never present without the other.
    async fn set_reset_token(
        &self,
        id: Uuid,
        digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    async fn set_verification_token(&self, id: Uuid, digest: &str) -> Result<(), AppError>;

    async fn find_by_verification_digest(
        &self,
        digest: &str,
    ) -> Result<Option<Account>, AppError>;

    /// Atomically consumes an unexpired reset token: matches the digest
    /// where the expiry is later than `now`, installs the new password
    /// digest, and clears both reset fields. Returns `None` when nothing
    /// matched (wrong token, already consumed, or expired).
    async fn consume_reset_token(
        &self,
        digest: &str,
        now: DateTime<Utc>,
        new_password_digest: &str,
    ) -> Result<Option<Account>, AppError>;

    /// Atomically consumes a verification token: matches the digest on an
    /// unverified account, flips `verified` to true, and clears the
    /// digest. Returns `None` when another request won the race.
    async fn consume_verification_token(
        &self,
        digest: &str,
    ) -> Result<Option<Account>, AppError>;
}
