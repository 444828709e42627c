use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::models::{NotificationError, SmsMessage};

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_sms(&self, message: &SmsMessage) -> Result<(), NotificationError>;
}

pub struct TwilioClient {
    client: Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    base_url: String,
}

impl TwilioClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(config.http_timeout())
                .build()
                .unwrap_or_default(),
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from_number: config.twilio_from_number.clone(),
            base_url: config.twilio_api_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from_number.is_empty()
    }
}

#[async_trait]
impl SmsSender for TwilioClient {
    async fn send_sms(&self, message: &SmsMessage) -> Result<(), NotificationError> {
        if !self.is_configured() {
            warn!("Twilio credentials not configured. SMS to {} not sent", message.to);
            return Ok(());
        }

        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );
        let form = [
            ("To", message.to.as_str()),
            ("From", self.from_number.as_str()),
            ("Body", message.body.as_str()),
        ];

        let response = self
            .client
            .post(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Provider {
                provider: "twilio",
                status: status.as_u16(),
                body,
            });
        }

        debug!("SMS accepted for {}", message.to);
        Ok(())
    }
}
