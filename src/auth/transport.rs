//! Session token transport strategies.
//!
//! The token either rides in an HttpOnly cookie or in the
//! `Authorization: Bearer` header; the choice is made once at startup from
//! configuration and the same strategy instance serves both issuance and
//! verification, so the two sides cannot disagree.

use std::sync::Arc;

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::dev::ServiceRequest;
use actix_web::HttpResponseBuilder;

use crate::configuration::AuthSettings;

/// Name of the session cookie in cookie mode.
pub const SESSION_COOKIE: &str = "auth-token";

/// How a session token travels between client and server.
pub trait SessionTransport: Send + Sync {
    /// Pull the token off an incoming request, if present.
    fn extract(&self, req: &ServiceRequest) -> Option<String>;

    /// Attach a freshly issued token to an outgoing response.
    fn attach(&self, resp: &mut HttpResponseBuilder, token: &str);

    /// Instruct the client to discard its token (logout).
    fn clear(&self, resp: &mut HttpResponseBuilder);
}

/// Cookie mode: HttpOnly, SameSite=Strict, Secure under TLS.
pub struct CookieTransport {
    secure: bool,
    max_age_seconds: i64,
}

impl SessionTransport for CookieTransport {
    fn extract(&self, req: &ServiceRequest) -> Option<String> {
        req.cookie(SESSION_COOKIE).map(|c| c.value().to_string())
    }

    fn attach(&self, resp: &mut HttpResponseBuilder, token: &str) {
        let cookie = Cookie::build(SESSION_COOKIE, token.to_string())
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .path("/")
            .max_age(CookieDuration::seconds(self.max_age_seconds))
            .finish();
        resp.cookie(cookie);
    }

    fn clear(&self, resp: &mut HttpResponseBuilder) {
        let cookie = Cookie::build(SESSION_COOKIE, "")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .path("/")
            .max_age(CookieDuration::ZERO)
            .finish();
        resp.cookie(cookie);
    }
}

/// Header mode: `Authorization: Bearer <token>`. The token is carried in
/// the response body at issuance, so attach and clear touch nothing.
pub struct BearerTransport;

impl SessionTransport for BearerTransport {
    fn extract(&self, req: &ServiceRequest) -> Option<String> {
        req.headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(|t| t.to_string())
    }

    fn attach(&self, _resp: &mut HttpResponseBuilder, _token: &str) {}

    fn clear(&self, _resp: &mut HttpResponseBuilder) {}
}

/// Select the process-wide transport from configuration.
pub fn from_settings(settings: &AuthSettings) -> Arc<dyn SessionTransport> {
    if settings.cookie_auth {
        Arc::new(CookieTransport {
            secure: settings.secure_cookies,
            max_age_seconds: settings.session_ttl_seconds,
        })
    } else {
        Arc::new(BearerTransport)
    }
}
