use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Overdue,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Overdue => "overdue",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "overdue" => Ok(PaymentStatus::Overdue),
            other => Err(format!("unknown payment status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentRow {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub student_id: Uuid,
    pub amount: i64,
    pub status: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub penalty_per_day: Option<i64>,
    pub paid_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PaymentRow {
    /// Unknown stored values read as pending so they still accrue penalties.
    pub fn parsed_status(&self) -> PaymentStatus {
        self.status.parse().unwrap_or(PaymentStatus::Pending)
    }

    /// The date penalties count from: end date, else due date.
    pub fn effective_end(&self) -> Option<DateTime<Utc>> {
        self.end_date.or(self.due_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("PAID".parse::<PaymentStatus>(), Ok(PaymentStatus::Paid));
        assert_eq!(" overdue ".parse::<PaymentStatus>(), Ok(PaymentStatus::Overdue));
        assert!("refunded".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for s in [PaymentStatus::Pending, PaymentStatus::Paid, PaymentStatus::Overdue] {
            assert_eq!(s.as_str().parse::<PaymentStatus>(), Ok(s));
        }
    }
}
