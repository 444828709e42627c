use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::models::{EmailMessage, NotificationError};

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), NotificationError>;
}

/// SendGrid v3 mail client.
pub struct SendGridClient {
    client: Client,
    api_key: String,
    from_email: String,
    base_url: String,
}

impl SendGridClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(config.http_timeout())
                .build()
                .unwrap_or_default(),
            api_key: config.sendgrid_api_key.clone(),
            from_email: config.sendgrid_from_email.clone(),
            base_url: config.sendgrid_api_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl EmailSender for SendGridClient {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        if self.api_key.is_empty() {
            warn!("SendGrid API key not configured. Email to {} not sent", message.to);
            return Ok(());
        }

        let payload = json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": self.from_email },
            "subject": message.subject,
            "content": [{ "type": "text/html", "value": message.html }],
        });

        let response = self
            .client
            .post(format!("{}/v3/mail/send", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Provider {
                provider: "sendgrid",
                status: status.as_u16(),
                body,
            });
        }

        debug!("Email '{}' accepted for {}", message.subject, message.to);
        Ok(())
    }
}
