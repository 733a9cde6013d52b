//! Telegram bot webhook: links a parent's chat to their account.
//!
//! A parent sends `/start <phone>` to the bot. Every parent record with a
//! matching phone gets the chat id, and the bot replies with the result.
//! Telegram retries non-2xx responses, so this always answers 200 once the
//! request itself is authentic.

use axum::{extract::State, http::HeaderMap, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::notify::messages;
use crate::parents::repo::{find_by_phone, save_parent};
use crate::state::AppState;

const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub chat: TelegramChat,
    pub text: Option<String>,
    pub contact: Option<TelegramContact>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TelegramContact {
    pub phone_number: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum BotCommand {
    /// `/start <phone>` or a shared contact.
    Link { phone: String },
    /// `/start` with nothing after it.
    StartWithoutPhone,
}

/// Parses `/start`, `/start@SomeBot` and a shared contact card.
pub fn parse_command(message: &TelegramMessage) -> Option<BotCommand> {
    if let Some(contact) = &message.contact {
        return Some(BotCommand::Link {
            phone: contact.phone_number.clone(),
        });
    }
    let text = message.text.as_deref()?.trim();
    let mut parts = text.splitn(2, char::is_whitespace);
    let command = parts.next()?;
    let command = command.split('@').next().unwrap_or(command);
    if command != "/start" {
        return None;
    }
    match parts.next().map(str::trim).filter(|p| !p.is_empty()) {
        Some(phone) => Some(BotCommand::Link {
            phone: phone.to_string(),
        }),
        None => Some(BotCommand::StartWithoutPhone),
    }
}

fn check_secret(expected: Option<&str>, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if provided == Some(expected) {
        Ok(())
    } else {
        warn!("Telegram webhook called with a missing or wrong secret token");
        Err(AppError::Unauthorized("Invalid webhook secret".to_string()))
    }
}

fn reply(state: &AppState, chat_id: String, text: String) {
    let Some(telegram) = state.telegram.clone() else {
        return;
    };
    tokio::spawn(async move {
        if let Err(e) = telegram.send_message(&chat_id, &text).await {
            warn!("Telegram reply to chat {chat_id} failed: {e}");
        }
    });
}

/// POST /api/telegram/webhook
pub async fn handle_telegram_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<TelegramUpdate>,
) -> Result<Json<Value>, AppError> {
    check_secret(state.config.telegram_webhook_secret.as_deref(), &headers)?;

    let Some(message) = update.message else {
        return Ok(Json(json!({ "ok": true })));
    };
    let chat_id = message.chat.id.to_string();

    let phone = match parse_command(&message) {
        Some(BotCommand::Link { phone }) => phone,
        Some(BotCommand::StartWithoutPhone) => {
            reply(&state, chat_id, messages::TELEGRAM_USAGE.to_string());
            return Ok(Json(json!({ "ok": true })));
        }
        None => return Ok(Json(json!({ "ok": true }))),
    };

    let parents = match find_by_phone(&state.db, &phone).await {
        Ok(parents) => parents,
        Err(e) => {
            warn!("Telegram /start from chat {chat_id}: parent lookup failed: {e}");
            return Ok(Json(json!({ "ok": true, "linked": 0 })));
        }
    };
    if parents.is_empty() {
        info!("Telegram /start from chat {chat_id}: no parent matches");
        reply(&state, chat_id, messages::TELEGRAM_NOT_FOUND.to_string());
        return Ok(Json(json!({ "ok": true, "linked": 0 })));
    }

    // A failed save only loses that one link; the rest still go through.
    let mut names = Vec::with_capacity(parents.len());
    for mut parent in parents {
        parent.telegram_chat_id = Some(chat_id.clone());
        match save_parent(&state.db, &parent).await {
            Ok(_) => names.push(parent.full_name),
            Err(e) => warn!("Could not link chat {chat_id} to parent {}: {e}", parent.id),
        }
    }
    info!("Linked Telegram chat {chat_id} to {} parent record(s)", names.len());

    let linked = names.len();
    if linked > 0 {
        reply(&state, chat_id, messages::telegram_linked(&names));
    }
    Ok(Json(json!({ "ok": true, "linked": linked })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn text_message(text: &str) -> TelegramMessage {
        TelegramMessage {
            chat: TelegramChat { id: 1 },
            text: Some(text.to_string()),
            contact: None,
        }
    }

    #[test]
    fn test_start_with_phone() {
        assert_eq!(
            parse_command(&text_message("/start +998901234567")),
            Some(BotCommand::Link {
                phone: "+998901234567".into()
            })
        );
    }

    #[test]
    fn test_start_with_bot_mention_and_spaces() {
        assert_eq!(
            parse_command(&text_message("  /start@CampusBot   90 123 45 67 ")),
            Some(BotCommand::Link {
                phone: "90 123 45 67".into()
            })
        );
    }

    #[test]
    fn test_bare_start() {
        assert_eq!(
            parse_command(&text_message("/start")),
            Some(BotCommand::StartWithoutPhone)
        );
    }

    #[test]
    fn test_other_text_ignored() {
        assert_eq!(parse_command(&text_message("hello")), None);
        assert_eq!(parse_command(&text_message("/help 123")), None);
        assert_eq!(parse_command(&text_message("/startx 123")), None);
    }

    #[test]
    fn test_contact_card_links() {
        let msg = TelegramMessage {
            chat: TelegramChat { id: 5 },
            text: None,
            contact: Some(TelegramContact {
                phone_number: "998901234567".into(),
            }),
        };
        assert_eq!(
            parse_command(&msg),
            Some(BotCommand::Link {
                phone: "998901234567".into()
            })
        );
    }

    #[test]
    fn test_update_deserializes_from_telegram_json() {
        let raw = r#"{"update_id":1,"message":{"message_id":2,"chat":{"id":-100,"type":"private"},"text":"/start 123456789"}}"#;
        let update: TelegramUpdate = serde_json::from_str(raw).unwrap();
        let message = update.message.unwrap();
        assert_eq!(message.chat.id, -100);
        assert!(matches!(parse_command(&message), Some(BotCommand::Link { .. })));
    }

    #[test]
    fn test_secret_check() {
        let mut headers = HeaderMap::new();
        assert!(check_secret(None, &headers).is_ok());
        assert!(check_secret(Some("s3"), &headers).is_err());
        headers.insert(SECRET_HEADER, HeaderValue::from_static("s3"));
        assert!(check_secret(Some("s3"), &headers).is_ok());
        assert!(check_secret(Some("other"), &headers).is_err());
    }
}
