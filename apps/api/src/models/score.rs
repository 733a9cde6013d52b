use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScoreType {
    Weekly,
    Mock,
}

impl ScoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreType::Weekly => "weekly",
            ScoreType::Mock => "mock",
        }
    }
}

/// One category of a score breakdown, e.g. `"listening": {20, 25, 80.0}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryScore {
    pub score: f64,
    pub max_score: f64,
    pub percent: f64,
}

pub type Breakdown = BTreeMap<String, CategoryScore>;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScoreRow {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub student_id: Uuid,
    pub group_id: Option<Uuid>,
    pub score_type: String,
    pub level: Option<String>,
    pub breakdown: Json<Breakdown>,
    pub overall_percent: f64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}
