//! Black-box tests over the full HTTP stack: real listener, in-memory
//! account store, recording mailer.

use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use staffdesk::accounts::{AccountStore, MemoryAccountStore};
use staffdesk::auth::single_use::token_digest;
use staffdesk::auth::validate_session_token;
use staffdesk::configuration::{ApplicationSettings, AuthSettings};
use staffdesk::error::AppError;
use staffdesk::mailer::Mailer;
use staffdesk::startup::run;

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingMailer {
    fn messages(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// The emailed link ends in the plaintext token.
    fn last_token(&self) -> String {
        let (_, _, body) = self.messages().last().cloned().expect("no email sent");
        body.rsplit('/').next().unwrap().to_string()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

/// Records the message, then reports delivery failure.
#[derive(Default)]
struct FailingMailer {
    inner: RecordingMailer,
}

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        let _ = self.inner.send(to, subject, body).await;
        Err(AppError::Email("smtp relay is down".to_string()))
    }
}

struct TestApp {
    address: String,
    store: Arc<MemoryAccountStore>,
    outbox: Arc<RecordingMailer>,
    auth: AuthSettings,
}

fn test_auth_settings() -> AuthSettings {
    AuthSettings {
        secret: "test-secret-key-at-least-32-characters-long".to_string(),
        session_ttl_seconds: 3600,
        cookie_auth: false,
        email_verification: false,
        secure_cookies: false,
    }
}

fn spawn_app_with_mailer(auth: AuthSettings, mailer: Arc<dyn Mailer>) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let store = Arc::new(MemoryAccountStore::new());
    let application = ApplicationSettings {
        port,
        base_url: address.clone(),
    };

    let server = run(
        listener,
        store.clone() as Arc<dyn AccountStore>,
        mailer,
        application,
        auth.clone(),
    )
    .expect("Failed to start server");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        store,
        outbox: Arc::new(RecordingMailer::default()),
        auth,
    }
}

fn spawn_app(auth: AuthSettings) -> TestApp {
    let outbox = Arc::new(RecordingMailer::default());
    let mut app = spawn_app_with_mailer(auth, outbox.clone() as Arc<dyn Mailer>);
    app.outbox = outbox;
    app
}

async fn register(app: &TestApp, email: &str, password: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}/auth/register", app.address))
        .json(&json!({ "name": "Alice", "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to execute request")
}

async fn login(app: &TestApp, email: &str, password: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}/auth/login", app.address))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to execute request")
}

// --- Registration and login ---

#[tokio::test]
async fn register_then_login_round_trip() {
    let app = spawn_app(test_auth_settings());

    let response = register(&app, "alice@example.com", "secret1").await;
    assert_eq!(201, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    let token = body["token"].as_str().expect("no token in response");
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("password_digest").is_none());

    // The issued token round-trips to the stored account id.
    let account = app
        .store
        .find_by_email("alice@example.com")
        .await
        .unwrap()
        .expect("account not created");
    let claims = validate_session_token(token, &app.auth).unwrap();
    assert_eq!(claims.account_id().unwrap(), account.id);

    let response = login(&app, "alice@example.com", "secret1").await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert!(body["token"].as_str().is_some());

    let response = login(&app, "alice@example.com", "wrong").await;
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn login_with_unknown_email_matches_wrong_password() {
    let app = spawn_app(test_auth_settings());
    register(&app, "alice@example.com", "secret1").await;

    let unknown = login(&app, "nobody@example.com", "secret1").await;
    let wrong = login(&app, "alice@example.com", "wrong").await;

    // Same status, same body shape: no account enumeration.
    assert_eq!(unknown.status(), wrong.status());
    let unknown: Value = unknown.json().await.unwrap();
    let wrong: Value = wrong.json().await.unwrap();
    assert_eq!(unknown["message"], wrong["message"]);
    assert_eq!(unknown["code"], wrong["code"]);
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let app = spawn_app(test_auth_settings());

    assert_eq!(201, register(&app, "alice@example.com", "secret1").await.status());
    assert_eq!(400, register(&app, "alice@example.com", "other-pass").await.status());
    // Case-insensitive identity key.
    assert_eq!(400, register(&app, "ALICE@example.com", "other-pass").await.status());
}

#[tokio::test]
async fn invalid_registration_input_is_rejected() {
    let app = spawn_app(test_auth_settings());

    for email in ["notanemail", "user@", "@example.com", "user@@example.com"] {
        let response = register(&app, email, "secret1").await;
        assert_eq!(400, response.status().as_u16(), "accepted bad email: {}", email);
    }

    let response = register(&app, "bob@example.com", "").await;
    assert_eq!(400, response.status().as_u16());
}

// --- Session transport ---

#[tokio::test]
async fn bearer_token_authorizes_protected_routes() {
    let app = spawn_app(test_auth_settings());
    let body: Value = register(&app, "alice@example.com", "secret1")
        .await
        .json()
        .await
        .unwrap();
    let token = body["token"].as_str().unwrap();

    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/auth/check", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["user"]["email"], "alice@example.com");

    // No token and garbage token are both rejected.
    let response = client
        .get(format!("{}/auth/check", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(401, response.status().as_u16());

    let response = client
        .get(format!("{}/auth/check", app.address))
        .header("Authorization", "Bearer garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn cookie_mode_issues_and_accepts_the_session_cookie() {
    let mut auth = test_auth_settings();
    auth.cookie_auth = true;
    let app = spawn_app(auth);

    let response = register(&app, "alice@example.com", "secret1").await;
    assert_eq!(201, response.status().as_u16());

    let set_cookie = response
        .headers()
        .get("set-cookie")
        .expect("no Set-Cookie in cookie mode")
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.contains("auth-token="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Strict"));

    let body: Value = response.json().await.unwrap();
    let token = body["token"].as_str().unwrap();
    let client = reqwest::Client::new();

    // The cookie authenticates.
    let response = client
        .get(format!("{}/auth/check", app.address))
        .header("Cookie", format!("auth-token={}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());

    // A bearer header does not: issuance and verification agree on the
    // transport.
    let response = client
        .get(format!("{}/auth/check", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn logout_in_cookie_mode_expires_the_cookie() {
    let mut auth = test_auth_settings();
    auth.cookie_auth = true;
    let app = spawn_app(auth);

    let response = reqwest::Client::new()
        .post(format!("{}/auth/logout", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());

    let set_cookie = response
        .headers()
        .get("set-cookie")
        .expect("logout did not clear the cookie")
        .to_str()
        .unwrap();
    assert!(set_cookie.contains("auth-token="));
    assert!(set_cookie.contains("Max-Age=0"));
}

// --- Password reset ---

#[tokio::test]
async fn forgot_then_reset_password_flow() {
    let app = spawn_app(test_auth_settings());
    register(&app, "alice@example.com", "secret1").await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/auth/forgot-password", app.address))
        .json(&json!({ "email": "alice@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());

    let messages = app.outbox.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "alice@example.com");
    assert_eq!(messages[0].1, "Password Reset");

    let token = app.outbox.last_token();
    let response = client
        .post(format!("{}/auth/reset-password/{}", app.address, token))
        .json(&json!({ "password": "brandnew1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());

    // New password works, old one does not.
    assert_eq!(200, login(&app, "alice@example.com", "brandnew1").await.status());
    assert_eq!(401, login(&app, "alice@example.com", "secret1").await.status());

    // Single use: the same token a second time is invalid.
    let response = client
        .post(format!("{}/auth/reset-password/{}", app.address, token))
        .json(&json!({ "password": "again1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn forgot_password_for_unknown_email_is_404() {
    let app = spawn_app(test_auth_settings());

    let response = reqwest::Client::new()
        .post(format!("{}/auth/forgot-password", app.address))
        .json(&json!({ "email": "nobody@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn expired_reset_token_is_rejected() {
    let app = spawn_app(test_auth_settings());
    register(&app, "alice@example.com", "secret1").await;

    let account = app
        .store
        .find_by_email("alice@example.com")
        .await
        .unwrap()
        .unwrap();

    // Backdate the expiry as if eleven minutes had passed since issuance.
    let token = "forged-but-known-plaintext-token-value01";
    app.store
        .set_reset_token(account.id, &token_digest(token), Utc::now() - Duration::minutes(1))
        .await
        .unwrap();

    let response = reqwest::Client::new()
        .post(format!("{}/auth/reset-password/{}", app.address, token))
        .json(&json!({ "password": "brandnew1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());

    // The password is unchanged.
    assert_eq!(200, login(&app, "alice@example.com", "secret1").await.status());
}

#[tokio::test]
async fn reset_token_survives_mail_delivery_failure() {
    let failing = Arc::new(FailingMailer::default());
    let app = spawn_app_with_mailer(test_auth_settings(), failing.clone() as Arc<dyn Mailer>);
    register(&app, "alice@example.com", "secret1").await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/auth/forgot-password", app.address))
        .json(&json!({ "email": "alice@example.com" }))
        .send()
        .await
        .unwrap();
    // Delivery failed, but issuance is not rolled back.
    assert_eq!(200, response.status().as_u16());

    let token = failing.inner.last_token();
    let response = client
        .post(format!("{}/auth/reset-password/{}", app.address, token))
        .json(&json!({ "password": "brandnew1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
}

// --- Password change ---

#[tokio::test]
async fn change_password_verifies_the_current_password() {
    let app = spawn_app(test_auth_settings());
    let body: Value = register(&app, "alice@example.com", "secret1")
        .await
        .json()
        .await
        .unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    let client = reqwest::Client::new();

    // Unauthenticated: rejected outright.
    let response = client
        .post(format!("{}/auth/change-password", app.address))
        .json(&json!({ "current_password": "secret1", "new_password": "brandnew1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(401, response.status().as_u16());

    // Wrong current password.
    let response = client
        .post(format!("{}/auth/change-password", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "current_password": "wrong", "new_password": "brandnew1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(401, response.status().as_u16());

    // Correct current password.
    let response = client
        .post(format!("{}/auth/change-password", app.address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "current_password": "secret1", "new_password": "brandnew1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());

    assert_eq!(200, login(&app, "alice@example.com", "brandnew1").await.status());
    assert_eq!(401, login(&app, "alice@example.com", "secret1").await.status());
}

// --- Email verification ---

#[tokio::test]
async fn email_verification_flow_gates_login_until_verified() {
    let mut auth = test_auth_settings();
    auth.email_verification = true;
    let app = spawn_app(auth);

    let response = register(&app, "alice@example.com", "secret1").await;
    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let session = body["token"].as_str().unwrap().to_string();
    assert_eq!(body["user"]["verified"], false);

    let messages = app.outbox.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].1, "Verify Your Email");

    // Login is blocked until the email is verified; the register-issued
    // session still authenticates the verification request itself.
    assert_eq!(401, login(&app, "alice@example.com", "secret1").await.status());

    let token = app.outbox.last_token();
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/auth/verify-email/{}", app.address, token))
        .header("Authorization", format!("Bearer {}", session))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());

    // Consumed token cannot be replayed.
    let response = client
        .get(format!("{}/auth/verify-email/{}", app.address, token))
        .header("Authorization", format!("Bearer {}", session))
        .send()
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());

    assert_eq!(200, login(&app, "alice@example.com", "secret1").await.status());
}

#[tokio::test]
async fn verification_is_not_issued_when_flag_is_off() {
    let app = spawn_app(test_auth_settings());
    register(&app, "alice@example.com", "secret1").await;

    assert!(app.outbox.messages().is_empty());
    let account = app
        .store
        .find_by_email("alice@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(account.verification_token_digest.is_none());
}

// --- Plumbing ---

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app(test_auth_settings());

    let response = reqwest::Client::new()
        .get(format!("{}/health_check", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn error_bodies_are_generic_and_structured() {
    let app = spawn_app(test_auth_settings());
    register(&app, "alice@example.com", "secret1").await;

    let response = login(&app, "alice@example.com", "wrong").await;
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["code"], "INVALID_CREDENTIALS");
    assert_eq!(body["status"], 401);
    assert!(body["error_id"].as_str().is_some());
    // No internals leak through the body.
    let raw = body.to_string();
    assert!(!raw.contains("digest"));
    assert!(!raw.contains("bcrypt"));
}
