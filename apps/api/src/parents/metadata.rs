//! Legacy parent metadata packed into the `phone` column.
//!
//! Older rows store `meta:` + base64(JSON) in `parents.phone`, carrying the
//! login, the linked student and the Telegram chat id alongside the real
//! phone number. The table now has proper columns for all of these; this
//! codec only exists so such rows still read correctly until their next
//! write migrates them.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::models::parent::{Parent, ParentRow};

pub const PREFIX: &str = "meta:";

/// The sidecar record. Field names match what legacy writers produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentMetadata {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub telegram_chat_id: Option<String>,
}

impl ParentMetadata {
    /// Drops empty strings so they encode as absent.
    fn normalized(&self) -> Self {
        let keep = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        Self {
            username: keep(&self.username),
            password: keep(&self.password),
            student_id: keep(&self.student_id),
            phone: keep(&self.phone),
            telegram_chat_id: keep(&self.telegram_chat_id),
        }
    }
}

/// Legacy writers sometimes stored chat ids as JSON numbers.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Returns `None` for plain phone numbers and for corrupt blobs.
pub fn decode(raw: &str) -> Option<ParentMetadata> {
    let payload = raw.trim().strip_prefix(PREFIX)?;
    let bytes = STANDARD.decode(payload.trim()).ok()?;
    serde_json::from_slice::<ParentMetadata>(&bytes)
        .ok()
        .map(|bag| bag.normalized())
}

/// Merges legacy metadata onto a stored row. Column values win over the
/// blob; with no blob the raw phone is used as-is.
pub fn unpack(row: ParentRow) -> Parent {
    let bag = row.phone.as_deref().and_then(decode);
    let needs_migration = bag.is_some()
        || row
            .phone
            .as_deref()
            .is_some_and(|p| p.trim_start().starts_with(PREFIX));
    let bag = bag.unwrap_or_default();

    let phone = if needs_migration {
        bag.phone.clone()
    } else {
        row.phone.clone()
    };

    let legacy_student_id = bag.student_id.as_deref().and_then(|raw| {
        let parsed = Uuid::parse_str(raw).ok();
        if parsed.is_none() {
            warn!("Parent {} has unparseable legacy student id '{raw}'", row.id);
        }
        parsed
    });

    Parent {
        id: row.id,
        admin_id: row.admin_id,
        full_name: row.full_name,
        phone,
        username: row.username.or(bag.username),
        student_id: row.student_id.or(legacy_student_id),
        telegram_chat_id: row.telegram_chat_id.or(bag.telegram_chat_id),
        created_at: row.created_at,
        legacy_password: if row.password_hash.is_none() {
            bag.password
        } else {
            None
        },
        password_hash: row.password_hash,
        needs_migration,
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::encode;
    use super::*;
    use chrono::Utc;

    fn full_bag() -> ParentMetadata {
        ParentMetadata {
            username: Some("malika".into()),
            password: Some("s3cret".into()),
            student_id: Some(Uuid::nil().to_string()),
            phone: Some("+998901234567".into()),
            telegram_chat_id: Some("553311".into()),
        }
    }

    fn row(phone: Option<&str>) -> ParentRow {
        ParentRow {
            id: Uuid::new_v4(),
            admin_id: Uuid::new_v4(),
            full_name: "Malika Karimova".into(),
            phone: phone.map(String::from),
            username: None,
            password_hash: None,
            student_id: None,
            telegram_chat_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_round_trip_full_bag() {
        let bag = full_bag();
        let encoded = encode(&bag).unwrap();
        assert!(encoded.starts_with(PREFIX));
        assert_eq!(decode(&encoded), Some(bag));
    }

    #[test]
    fn test_round_trip_partial_bag() {
        let bag = ParentMetadata {
            phone: Some("+998935550000".into()),
            ..Default::default()
        };
        assert_eq!(decode(&encode(&bag).unwrap()), Some(bag));
        assert_eq!(decode(&encode(&ParentMetadata::default()).unwrap()), Some(ParentMetadata::default()));
    }

    #[test]
    fn test_empty_fields_are_omitted() {
        let bag = ParentMetadata {
            username: Some(String::new()),
            phone: Some("123".into()),
            ..Default::default()
        };
        let encoded = encode(&bag).unwrap();
        let json = STANDARD.decode(encoded.strip_prefix(PREFIX).unwrap()).unwrap();
        assert_eq!(String::from_utf8(json).unwrap(), r#"{"phone":"123"}"#);
    }

    #[test]
    fn test_plain_phone_decodes_to_none() {
        assert_eq!(decode("+998901234567"), None);
        assert_eq!(decode(""), None);
    }

    #[test]
    fn test_corrupt_payload_decodes_to_none() {
        assert_eq!(decode("meta:@@not-base64@@"), None);
        let not_json = format!("{PREFIX}{}", STANDARD.encode("not json"));
        assert_eq!(decode(&not_json), None);
    }

    #[test]
    fn test_numeric_chat_id_accepted() {
        let raw = format!("{PREFIX}{}", STANDARD.encode(r#"{"telegramChatId":987654}"#));
        let bag = decode(&raw).unwrap();
        assert_eq!(bag.telegram_chat_id.as_deref(), Some("987654"));
    }

    #[test]
    fn test_unpack_plain_phone_passes_through() {
        let parent = unpack(row(Some("+998901234567")));
        assert_eq!(parent.phone.as_deref(), Some("+998901234567"));
        assert!(!parent.needs_migration);
        assert_eq!(parent.username, None);
    }

    #[test]
    fn test_unpack_merges_legacy_fields() {
        let encoded = encode(&full_bag()).unwrap();
        let parent = unpack(row(Some(&encoded)));
        assert!(parent.needs_migration);
        assert_eq!(parent.phone.as_deref(), Some("+998901234567"));
        assert_eq!(parent.username.as_deref(), Some("malika"));
        assert_eq!(parent.student_id, Some(Uuid::nil()));
        assert_eq!(parent.telegram_chat_id.as_deref(), Some("553311"));
        assert_eq!(parent.legacy_password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_columns_win_over_blob() {
        let encoded = encode(&full_bag()).unwrap();
        let mut r = row(Some(&encoded));
        r.telegram_chat_id = Some("111".into());
        r.password_hash = Some("salt$hash".into());
        let parent = unpack(r);
        assert_eq!(parent.telegram_chat_id.as_deref(), Some("111"));
        assert_eq!(parent.legacy_password, None);
    }

    #[test]
    fn test_corrupt_blob_is_not_exposed_as_phone() {
        let parent = unpack(row(Some("meta:???")));
        assert!(parent.needs_migration);
        assert_eq!(parent.phone, None);
    }

    #[test]
    fn test_serialized_parent_hides_credentials() {
        let encoded = encode(&full_bag()).unwrap();
        let json = serde_json::to_value(unpack(row(Some(&encoded)))).unwrap();
        assert!(json.get("legacy_password").is_none());
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "malika");
    }
}
