use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A parent row as stored. `phone` may still carry a legacy metadata blob;
/// always pass rows through `parents::metadata::unpack` before use.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ParentRow {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub student_id: Option<Uuid>,
    pub telegram_chat_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A parent with legacy metadata merged in. Credentials are never serialized.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Parent {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    pub username: Option<String>,
    pub student_id: Option<Uuid>,
    pub telegram_chat_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub password_hash: Option<String>,
    /// Plain-text password recovered from a legacy blob; hashed on next write.
    #[serde(skip)]
    pub legacy_password: Option<String>,
    /// True when the stored phone column still holds a metadata blob.
    #[serde(skip)]
    pub needs_migration: bool,
}
