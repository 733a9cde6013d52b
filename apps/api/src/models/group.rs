use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupRow {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub name: String,
    pub teacher_name: Option<String>,
    pub schedule: Option<String>,
    pub monthly_fee: i64,
    pub created_at: DateTime<Utc>,
}
