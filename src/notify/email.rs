//! Email delivery backends

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("invalid recipient address: {0}")]
    InvalidRecipient(String),

    #[error("email transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("email provider rejected message: status={status}")]
    Rejected { status: u16, body: String },
}

/// One outgoing email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Email backend abstraction (SendGrid, log-only, test doubles).
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

fn looks_like_email(address: &str) -> bool {
    match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !address.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// SendGrid v3 HTTP API sender
pub struct SendGridSender {
    client: reqwest::Client,
    api_key: String,
    from_address: String,
    from_name: String,
}

impl SendGridSender {
    pub fn new(api_key: String, from_address: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from_address,
            from_name: "Game Rental".to_string(),
        }
    }
}

#[async_trait]
impl EmailSender for SendGridSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        if !looks_like_email(&message.to) {
            return Err(EmailError::InvalidRecipient(message.to.clone()));
        }

        let body = json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": self.from_address, "name": self.from_name },
            "subject": message.subject,
            "content": [
                { "type": "text/plain", "value": message.text },
                { "type": "text/html", "value": message.html },
            ],
        });

        let response = self
            .client
            .post(SENDGRID_SEND_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(to = %message.to, subject = %message.subject, "Email sent");
        Ok(())
    }
}

/// Writes mail to the log instead of sending it
#[derive(Debug, Default, Clone)]
pub struct LogSender;

#[async_trait]
impl EmailSender for LogSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.text,
            "Email (log only)"
        );
        Ok(())
    }
}
