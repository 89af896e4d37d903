//! Authentication routes.
//!
//! Registration, login, logout, the password-reset pair, password change,
//! email verification, and the session check. Everything here speaks
//! JSON and terminates on the first failure; see `error.rs` for the
//! status each failure class maps to.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::accounts::{AccountStore, NewAccount, Principal};
use crate::auth::transport::SessionTransport;
use crate::auth::{hash_password, issue_session_token, single_use, verify_password};
use crate::configuration::{ApplicationSettings, AuthSettings};
use crate::error::AppError;
use crate::mailer::Mailer;
use crate::validators::{is_valid_email, is_valid_name};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Issued-session response: the token also rides in the cookie when
/// cookie transport is configured, but always appears in the body.
#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: Principal,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// POST /auth/register
///
/// Create an account and issue a session token.
///
/// The duplicate pre-check runs before hashing so a known-duplicate
/// request never pays for bcrypt; the store's uniqueness constraint
/// still closes the remaining race.
pub async fn register(
    form: web::Json<RegisterRequest>,
    store: web::Data<dyn AccountStore>,
    auth: web::Data<AuthSettings>,
    transport: web::Data<dyn SessionTransport>,
    mailer: web::Data<dyn Mailer>,
    application: web::Data<ApplicationSettings>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    let name = is_valid_name(&form.name)?;
    tracing::info!(email = %email, "Attempting to register account");

    if store.find_by_email(&email).await?.is_some() {
        tracing::warn!(email = %email, "Registration failed: email already in use");
        return Err(AppError::DuplicateIdentity);
    }

    let password_digest = hash_password(&form.password)?;

    // When verification is required, the token digest is written as part
    // of account creation; the plaintext exists only long enough to be
    // mailed out.
    let verification_token = if auth.email_verification {
        Some(single_use::generate_token())
    } else {
        None
    };

    let account = store
        .create(NewAccount {
            email,
            name,
            password_digest,
            verification_token_digest: verification_token
                .as_deref()
                .map(single_use::token_digest),
        })
        .await?;
    tracing::info!(account_id = %account.id, "Account registered");

    if let Some(token) = verification_token {
        let link = format!("{}/auth/verify-email/{}", application.base_url, token);
        if let Err(e) = mailer
            .send(
                &account.email,
                "Verify Your Email",
                &format!("Click here to verify your email: {}", link),
            )
            .await
        {
            // The token stays valid; delivery is best-effort.
            tracing::error!(account_id = %account.id, error = %e, "Verification email failed");
        }
    }

    let token = issue_session_token(account.id, &auth)?;
    let mut resp = HttpResponse::Created();
    transport.attach(&mut resp, &token);

    Ok(resp.json(AuthResponse {
        token,
        user: Principal::from(&account),
        message: "Registration successful.",
    }))
}

/// POST /auth/login
///
/// Verify credentials and issue a session token. Unknown email and wrong
/// password produce the same response.
pub async fn login(
    form: web::Json<LoginRequest>,
    store: web::Data<dyn AccountStore>,
    auth: web::Data<AuthSettings>,
    transport: web::Data<dyn SessionTransport>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    tracing::info!(email = %email, "Login attempt");

    let account = match store.find_by_email(&email).await? {
        Some(account) if verify_password(&form.password, &account.password_digest)? => account,
        _ => {
            tracing::warn!(email = %email, "Login failed");
            return Err(AppError::InvalidCredentials);
        }
    };

    if auth.email_verification && !account.verified {
        tracing::warn!(account_id = %account.id, "Login blocked: email not verified");
        return Err(AppError::EmailNotVerified);
    }

    tracing::info!(account_id = %account.id, "Login successful");

    let token = issue_session_token(account.id, &auth)?;
    let mut resp = HttpResponse::Ok();
    transport.attach(&mut resp, &token);

    Ok(resp.json(AuthResponse {
        token,
        user: Principal::from(&account),
        message: "Login successful.",
    }))
}

/// POST /auth/logout
///
/// Sessions are stateless, so logout is a client-side discard: in cookie
/// mode the cookie is expired, in bearer mode there is nothing to clear.
pub async fn logout(
    transport: web::Data<dyn SessionTransport>,
) -> Result<HttpResponse, AppError> {
    let mut resp = HttpResponse::Ok();
    transport.clear(&mut resp);

    Ok(resp.json(MessageResponse {
        message: "Logged out successfully",
    }))
}

/// POST /auth/forgot-password
///
/// Issue a reset token and mail it out-of-band. The response does not
/// depend on whether delivery succeeded; the token stands either way.
pub async fn forgot_password(
    form: web::Json<ForgotPasswordRequest>,
    store: web::Data<dyn AccountStore>,
    mailer: web::Data<dyn Mailer>,
    application: web::Data<ApplicationSettings>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    tracing::info!(email = %email, "Password reset requested");

    let account = store
        .find_by_email(&email)
        .await?
        .ok_or(AppError::AccountNotFound)?;

    let token = single_use::issue_reset(store.get_ref(), &account).await?;

    let link = format!("{}/auth/reset-password/{}", application.base_url, token);
    if let Err(e) = mailer
        .send(
            &account.email,
            "Password Reset",
            &format!("Reset your password here: {}", link),
        )
        .await
    {
        tracing::error!(account_id = %account.id, error = %e, "Password reset email failed");
    }

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Password reset email sent",
    }))
}

/// POST /auth/reset-password/{token}
///
/// Consume a reset token and install the new password. Wrong and expired
/// tokens are indistinguishable.
pub async fn reset_password(
    path: web::Path<String>,
    form: web::Json<ResetPasswordRequest>,
    store: web::Data<dyn AccountStore>,
) -> Result<HttpResponse, AppError> {
    let token = path.into_inner();

    single_use::consume_reset(store.get_ref(), &token, &form.password).await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Password reset successful",
    }))
}

/// POST /auth/change-password (authenticated)
///
/// Verify the current password before replacing it.
pub async fn change_password(
    principal: web::ReqData<Principal>,
    form: web::Json<ChangePasswordRequest>,
    store: web::Data<dyn AccountStore>,
) -> Result<HttpResponse, AppError> {
    tracing::info!(account_id = %principal.id, "Password change attempt");

    let account = store
        .find_by_id(principal.id)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    if !verify_password(&form.current_password, &account.password_digest)? {
        tracing::warn!(account_id = %account.id, "Password change failed: wrong current password");
        return Err(AppError::InvalidCredentials);
    }

    let digest = hash_password(&form.new_password)?;
    store.set_password(account.id, &digest).await?;

    tracing::info!(account_id = %account.id, "Password changed");
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Password changed successfully",
    }))
}

/// GET /auth/verify-email/{token} (authenticated)
///
/// Consume an email-verification token, flipping the account to
/// verified exactly once.
pub async fn verify_email(
    path: web::Path<String>,
    store: web::Data<dyn AccountStore>,
) -> Result<HttpResponse, AppError> {
    let token = path.into_inner();

    single_use::consume_verification(store.get_ref(), &token).await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Email verified successfully.",
    }))
}

/// GET /auth/check (authenticated)
///
/// Return the resolved principal for the presented session token.
pub async fn check(principal: web::ReqData<Principal>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "authenticated": true,
        "user": principal.into_inner(),
    })))
}
