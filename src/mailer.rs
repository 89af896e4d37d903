//! Outbound email delivery.
//!
//! The auth flows treat delivery as best-effort: a reset or verification
//! token stays valid even when the email carrying it never leaves the
//! building. Callers that issued a token log a delivery failure and move
//! on; nothing is retried here.

use async_trait::async_trait;
use serde::Serialize;

use crate::configuration::EmailSettings;
use crate::error::AppError;
use crate::validators::is_valid_email;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError>;
}

/// Mailer backed by an HTTP email delivery service.
#[derive(Clone)]
pub struct HttpMailer {
    http_client: reqwest::Client,
    base_url: String,
    sender: String,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl HttpMailer {
    pub fn new(settings: &EmailSettings, http_client: reqwest::Client) -> Result<Self, AppError> {
        let sender = is_valid_email(&settings.sender)
            .map_err(|e| AppError::Internal(format!("invalid sender address: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: settings.base_url.clone(),
            sender,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        let url = format!("{}/email", self.base_url);
        let request = SendEmailRequest {
            from: &self.sender,
            to,
            subject,
            text: body,
        };

        self.http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Email(format!("failed to send email: {}", e)))?
            .error_for_status()
            .map_err(|e| AppError::Email(format!("email service returned error: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_address_is_validated_at_construction() {
        let bad = EmailSettings {
            base_url: "http://localhost:8025".to_string(),
            sender: "not-an-address".to_string(),
        };
        assert!(HttpMailer::new(&bad, reqwest::Client::new()).is_err());

        let good = EmailSettings {
            base_url: "http://localhost:8025".to_string(),
            sender: "noreply@staffdesk.example".to_string(),
        };
        assert!(HttpMailer::new(&good, reqwest::Client::new()).is_ok());
    }
}
