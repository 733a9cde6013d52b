use chrono::{DateTime, Utc};

use crate::billing::penalty::{compute_penalty, days_until, is_due_soon, PenaltyInput};
use crate::models::payment::PaymentRow;

/// The reminder a single unpaid payment warrants at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reminder {
    DueSoon {
        days_left: i64,
    },
    Overdue {
        overdue_days: i64,
        penalty_amount: i64,
        total_due: i64,
    },
}

/// Overdue takes precedence over due-soon; paid payments get nothing.
pub fn reminder_for(
    row: &PaymentRow,
    default_penalty_per_day: i64,
    now: DateTime<Utc>,
) -> Option<Reminder> {
    let input = PenaltyInput::from_row(row, default_penalty_per_day);
    let penalty = compute_penalty(&input, now);
    if penalty.is_overdue {
        return Some(Reminder::Overdue {
            overdue_days: penalty.overdue_days,
            penalty_amount: penalty.penalty_amount,
            total_due: penalty.total_due,
        });
    }
    let due = input.end_date?;
    is_due_soon(input.status, Some(due), now).then(|| Reminder::DueSoon {
        days_left: days_until(due, now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn row(status: &str, end: Option<DateTime<Utc>>) -> PaymentRow {
        PaymentRow {
            id: Uuid::new_v4(),
            admin_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            amount: 300_000,
            status: status.to_string(),
            start_date: None,
            end_date: end,
            due_date: None,
            penalty_per_day: Some(20_000),
            paid_at: None,
            note: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_overdue_reminder() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
        let r = reminder_for(&row("pending", Some(now - Duration::days(2))), 10_000, now);
        assert_eq!(
            r,
            Some(Reminder::Overdue {
                overdue_days: 2,
                penalty_amount: 40_000,
                total_due: 340_000
            })
        );
    }

    #[test]
    fn test_due_soon_reminder() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
        let r = reminder_for(&row("pending", Some(now + Duration::days(1))), 10_000, now);
        assert_eq!(r, Some(Reminder::DueSoon { days_left: 1 }));
    }

    #[test]
    fn test_far_future_and_paid_get_nothing() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
        assert_eq!(
            reminder_for(&row("pending", Some(now + Duration::days(20))), 10_000, now),
            None
        );
        assert_eq!(
            reminder_for(&row("paid", Some(now - Duration::days(20))), 10_000, now),
            None
        );
        assert_eq!(reminder_for(&row("pending", None), 10_000, now), None);
    }
}
