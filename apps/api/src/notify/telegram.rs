//! Thin client for the Telegram Bot API `sendMessage` call.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::notify::{Notifier, NotifyError, Recipient};

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    token: String,
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: String) -> Self {
        Self::with_base_url(token, TELEGRAM_API_URL.to_string())
    }

    pub fn with_base_url(token: String, base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            token,
            base_url,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url.trim_end_matches('/'), self.token, method)
    }

    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&SendMessageRequest { chat_id, text })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<TelegramResponse>(&body).ok();

        match parsed {
            Some(r) if status.is_success() && r.ok => {
                debug!("Telegram message delivered to chat {chat_id}");
                Ok(())
            }
            Some(r) => Err(NotifyError::Api {
                channel: "telegram",
                status: status.as_u16(),
                message: r.description.unwrap_or(body),
            }),
            None => Err(NotifyError::Api {
                channel: "telegram",
                status: status.as_u16(),
                message: body,
            }),
        }
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    fn channel(&self) -> &'static str {
        "telegram"
    }

    fn can_reach(&self, recipient: &Recipient) -> bool {
        recipient.telegram_chat_id.is_some()
    }

    async fn send(&self, recipient: &Recipient, text: &str) -> Result<(), NotifyError> {
        let chat_id = recipient
            .telegram_chat_id
            .as_deref()
            .ok_or(NotifyError::Unaddressable)?;
        self.send_message(chat_id, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_url() {
        let tg = TelegramClient::with_base_url("123:abc".into(), "http://localhost:9000/".into());
        assert_eq!(
            tg.method_url("sendMessage"),
            "http://localhost:9000/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_only_reaches_linked_chats() {
        let tg = TelegramClient::new("t".into());
        assert!(!tg.can_reach(&Recipient {
            phone: Some("+998900000000".into()),
            telegram_chat_id: None,
        }));
        assert!(tg.can_reach(&Recipient {
            phone: None,
            telegram_chat_id: Some("42".into()),
        }));
    }
}
