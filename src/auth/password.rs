//! Password hashing and verification.
//!
//! Bcrypt with a fixed cost factor: the cost is never caller-supplied, so
//! a client cannot force a cheap hash. The plaintext is consumed here and
//! never logged or returned.

use bcrypt::{hash, verify};

use crate::error::{AppError, ValidationError};

/// Fixed bcrypt cost factor (same as the default work factor used at
/// account creation throughout the system).
const BCRYPT_COST: u32 = 12;

/// Bcrypt only reads the first 72 bytes of input; longer passwords are
/// rejected outright rather than silently truncated.
const MAX_PASSWORD_LENGTH: usize = 72;

/// Hash a plaintext password into a salted bcrypt digest.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    if password.is_empty() {
        return Err(AppError::Validation(ValidationError::EmptyField("password")));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooLong(
            "password",
            MAX_PASSWORD_LENGTH,
        )));
    }

    hash(password, BCRYPT_COST)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

/// Verify a plaintext password against a stored digest.
///
/// The comparison is constant-time inside the bcrypt crate; a mismatch is
/// `Ok(false)`, not an error.
pub fn verify_password(password: &str, digest: &str) -> Result<bool, AppError> {
    verify(password, digest)
        .map_err(|e| AppError::Internal(format!("password verification failed: {}", e)))
}
