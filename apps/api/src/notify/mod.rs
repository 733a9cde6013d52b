//! Best-effort parent notifications over Telegram and SMS.
//!
//! Sends are scheduled with `tokio::spawn` and never awaited by handlers.
//! Failures are logged and dropped: no retries, no ordering between sends,
//! and nothing ever reaches the HTTP response.

pub mod messages;
pub mod sms;
pub mod telegram;
pub mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::notify::sms::SmsClient;
use crate::notify::telegram::TelegramClient;
use crate::parents::repo::recipients_for_student;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{channel} API error (status {status}): {message}")]
    Api {
        channel: &'static str,
        status: u16,
        message: String,
    },

    #[error("recipient has no address for this channel")]
    Unaddressable,
}

/// Where a message can be delivered. Channels skip what they cannot reach.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipient {
    pub phone: Option<String>,
    pub telegram_chat_id: Option<String>,
}

impl Recipient {
    pub fn is_reachable(&self) -> bool {
        self.phone.is_some() || self.telegram_chat_id.is_some()
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn channel(&self) -> &'static str;

    fn can_reach(&self, recipient: &Recipient) -> bool;

    async fn send(&self, recipient: &Recipient, text: &str) -> Result<(), NotifyError>;
}

/// Fans a message out to every configured channel.
#[derive(Clone, Default)]
pub struct Dispatcher {
    channels: Vec<Arc<dyn Notifier>>,
}

impl Dispatcher {
    pub fn new(channels: Vec<Arc<dyn Notifier>>) -> Self {
        Self { channels }
    }

    pub fn from_config(config: &Config, telegram: Option<TelegramClient>) -> Self {
        let mut channels: Vec<Arc<dyn Notifier>> = Vec::new();
        if let Some(tg) = telegram {
            channels.push(Arc::new(tg));
        }
        if let Some(twilio) = &config.twilio {
            channels.push(Arc::new(SmsClient::new(twilio.clone())));
        }
        Self { channels }
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.channel()).collect()
    }

    /// Spawns one task per (recipient, channel) pair and returns immediately.
    /// The handles are only useful to tests; callers normally drop them.
    pub fn dispatch(&self, recipients: &[Recipient], text: &str) -> Vec<JoinHandle<()>> {
        let text: Arc<str> = Arc::from(text);
        let mut handles = Vec::new();
        for recipient in recipients {
            for channel in &self.channels {
                if !channel.can_reach(recipient) {
                    continue;
                }
                let channel = Arc::clone(channel);
                let recipient = recipient.clone();
                let text = Arc::clone(&text);
                handles.push(tokio::spawn(async move {
                    if let Err(e) = channel.send(&recipient, &text).await {
                        warn!("{} notification failed: {e}", channel.channel());
                    }
                }));
            }
        }
        if handles.is_empty() {
            debug!("No deliverable channel for {} recipient(s)", recipients.len());
        }
        handles
    }
}

/// Looks up a student's parents and notifies them, entirely in the background.
pub fn notify_student_parents(state: &AppState, admin_id: Uuid, student_id: Uuid, text: String) {
    let db = state.db.clone();
    let dispatcher = state.notifier.clone();
    if dispatcher.channels.is_empty() {
        debug!("Notifications disabled; skipping message for student {student_id}");
        return;
    }
    tokio::spawn(async move {
        match recipients_for_student(&db, admin_id, student_id).await {
            Ok(recipients) => {
                dispatcher.dispatch(&recipients, &text);
            }
            Err(e) => warn!("Could not load parents of student {student_id}: {e}"),
        }
    });
}
