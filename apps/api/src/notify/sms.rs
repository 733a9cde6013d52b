//! SMS delivery through a Twilio-compatible Messages API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::TwilioConfig;
use crate::notify::{Notifier, NotifyError, Recipient};

const TWILIO_API_URL: &str = "https://api.twilio.com/2010-04-01";

#[derive(Debug, Deserialize)]
struct TwilioError {
    message: String,
}

#[derive(Clone)]
pub struct SmsClient {
    client: Client,
    config: TwilioConfig,
    base_url: String,
}

impl SmsClient {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            config,
            base_url: TWILIO_API_URL.to_string(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.base_url, self.config.account_sid
        )
    }
}

#[async_trait]
impl Notifier for SmsClient {
    fn channel(&self) -> &'static str {
        "sms"
    }

    fn can_reach(&self, recipient: &Recipient) -> bool {
        recipient.phone.is_some()
    }

    async fn send(&self, recipient: &Recipient, text: &str) -> Result<(), NotifyError> {
        let to = recipient.phone.as_deref().ok_or(NotifyError::Unaddressable)?;
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", to),
                ("From", self.config.from_number.as_str()),
                ("Body", text),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!("SMS accepted for {to}");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<TwilioError>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        Err(NotifyError::Api {
            channel: "sms",
            status: status.as_u16(),
            message,
        })
    }
}
