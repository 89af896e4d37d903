//! Unified error handling for the auth core.
//!
//! Every failure a request can hit maps to a fixed, non-internal HTTP status
//! with a generic message. Internal detail (digests, raw store errors, stack
//! traces) goes to the logs only, never to the client. Failures within one
//! class intentionally share a response shape: a wrong reset token and an
//! expired one are indistinguishable to the caller, as are an unknown email
//! and a wrong password on login.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// Validation errors for untrusted client input.
#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyField(&'static str),
    TooShort(&'static str, usize),
    TooLong(&'static str, usize),
    InvalidFormat(&'static str),
    SuspiciousContent(&'static str),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::SuspiciousContent(field) => {
                write!(f, "{} contains suspicious content", field)
            }
        }
    }
}

impl StdError for ValidationError {}

/// Application-level error taxonomy.
///
/// All of these are terminal for the request; nothing is retried
/// internally. `Unavailable` is the only class worth a caller-side retry.
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    /// An account with this email already exists.
    DuplicateIdentity,
    /// Wrong email or wrong password; the two are deliberately merged
    /// so login cannot be used to enumerate accounts.
    InvalidCredentials,
    /// Login attempted before email verification while verification
    /// is required by configuration.
    EmailNotVerified,
    AccountNotFound,
    /// Reset or verification token did not match or has expired;
    /// deliberately merged for the same reason as `InvalidCredentials`.
    InvalidOrExpiredToken,
    /// Verification attempted for an account that is already verified.
    AlreadyVerified,
    /// Missing, invalid, or expired session token, or the account
    /// behind a valid token no longer exists.
    Unauthenticated,
    /// Valid session, insufficient role.
    Forbidden,
    /// Store or downstream network failure; bounded, never a hang.
    Unavailable(String),
    /// Outbound email delivery failure.
    Email(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::DuplicateIdentity => write!(f, "account already exists"),
            AppError::InvalidCredentials => write!(f, "invalid credentials"),
            AppError::EmailNotVerified => write!(f, "email not verified"),
            AppError::AccountNotFound => write!(f, "account not found"),
            AppError::InvalidOrExpiredToken => write!(f, "invalid or expired token"),
            AppError::AlreadyVerified => write!(f, "email already verified"),
            AppError::Unauthenticated => write!(f, "not authenticated"),
            AppError::Forbidden => write!(f, "insufficient role"),
            AppError::Unavailable(msg) => write!(f, "service unavailable: {}", msg),
            AppError::Email(msg) => write!(f, "email delivery failed: {}", msg),
            AppError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.message().contains("duplicate key") => {
                AppError::DuplicateIdentity
            }
            sqlx::Error::RowNotFound => AppError::AccountNotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::Unavailable(err.to_string())
            }
            _ => AppError::Unavailable(err.to_string()),
        }
    }
}

/// JSON body returned for every error response.
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Correlates the response with the server-side log line.
    pub error_id: String,
    pub message: String,
    pub code: String,
    pub status: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl AppError {
    /// The fixed status, code and client-safe message for this error class.
    fn response_parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(e) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            AppError::DuplicateIdentity => (
                StatusCode::BAD_REQUEST,
                "DUPLICATE_IDENTITY",
                "User already exists".to_string(),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid credentials.".to_string(),
            ),
            AppError::EmailNotVerified => (
                StatusCode::UNAUTHORIZED,
                "EMAIL_NOT_VERIFIED",
                "Please verify your email before logging in.".to_string(),
            ),
            AppError::AccountNotFound => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "User not found".to_string(),
            ),
            AppError::InvalidOrExpiredToken => (
                StatusCode::BAD_REQUEST,
                "TOKEN_INVALID",
                "Invalid or expired token".to_string(),
            ),
            AppError::AlreadyVerified => (
                StatusCode::BAD_REQUEST,
                "ALREADY_VERIFIED",
                "Email already verified".to_string(),
            ),
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                "Not authorized".to_string(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Not authorized to access this route".to_string(),
            ),
            AppError::Unavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Service temporarily unavailable".to_string(),
            ),
            AppError::Email(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "EMAIL_SERVICE_ERROR",
                "Email service temporarily unavailable".to_string(),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        }
    }

    fn log(&self, error_id: &str) {
        match self {
            AppError::Unavailable(_) | AppError::Email(_) | AppError::Internal(_) => {
                tracing::error!(error_id = error_id, error = %self, "Request failed");
            }
            _ => {
                tracing::warn!(error_id = error_id, error = %self, "Request rejected");
            }
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.response_parts().0
    }

    fn error_response(&self) -> HttpResponse {
        let error_id = uuid::Uuid::new_v4().to_string();
        self.log(&error_id);

        let (status, code, message) = self.response_parts();
        let body = ErrorResponse::new(error_id, message, code.to_string(), status.as_u16());

        HttpResponse::build(status).json(body)
    }
}
