//! Late-fee arithmetic for payments.
//!
//! Penalties are never stored. They are derived from the payment's dates on
//! every read, so the numbers always reflect "now".

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::payment::{PaymentRow, PaymentStatus};

/// Number of days ahead of the due date at which reminders start.
pub const DUE_SOON_WINDOW_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenaltyInput {
    pub status: PaymentStatus,
    pub amount: i64,
    /// End of the paid period, falling back to the due date.
    pub end_date: Option<DateTime<Utc>>,
    pub penalty_per_day: i64,
}

impl PenaltyInput {
    pub fn from_row(row: &PaymentRow, default_penalty_per_day: i64) -> Self {
        Self {
            status: row.parsed_status(),
            amount: row.amount,
            end_date: row.effective_end(),
            penalty_per_day: row.penalty_per_day.unwrap_or(default_penalty_per_day),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PenaltyBreakdown {
    pub overdue_days: i64,
    pub penalty_amount: i64,
    pub total_due: i64,
    pub is_overdue: bool,
    pub display_status: PaymentStatus,
}

/// Computes overdue days and the accrued late fee as of `now`.
///
/// Paid payments never accrue a penalty. A payment is overdue only once
/// `now` is strictly past its end date; from then on every started day
/// counts, with a minimum of one.
pub fn compute_penalty(input: &PenaltyInput, now: DateTime<Utc>) -> PenaltyBreakdown {
    let end = match input.end_date {
        Some(end) if input.status != PaymentStatus::Paid && now > end => end,
        _ => {
            return PenaltyBreakdown {
                overdue_days: 0,
                penalty_amount: 0,
                total_due: input.amount,
                is_overdue: false,
                display_status: input.status,
            }
        }
    };

    let overdue_days = (now - end).num_days().max(1);
    let penalty_amount = overdue_days.saturating_mul(input.penalty_per_day.max(0));

    PenaltyBreakdown {
        overdue_days,
        penalty_amount,
        total_due: input.amount.saturating_add(penalty_amount),
        is_overdue: true,
        display_status: PaymentStatus::Overdue,
    }
}

/// Whole days until `due`, rounded up. Negative once the date has passed.
pub fn days_until(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let remaining = due - now;
    let days = remaining.num_days();
    if remaining > Duration::days(days) {
        days + 1
    } else {
        days
    }
}

/// Reminder rule, independent of penalties: unpaid and due within the window.
pub fn is_due_soon(status: PaymentStatus, due: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    if status == PaymentStatus::Paid {
        return false;
    }
    match due {
        Some(due) => (0..=DUE_SOON_WINDOW_DAYS).contains(&days_until(due, now)),
        None => false,
    }
}

/// Aggregate of a set of payments, with penalties evaluated at one instant.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct PaymentSummary {
    pub count: usize,
    pub paid_total: i64,
    pub outstanding_total: i64,
    pub penalty_total: i64,
    pub overdue_count: usize,
    pub due_soon_count: usize,
}

pub fn summarize(
    payments: &[PaymentRow],
    default_penalty_per_day: i64,
    now: DateTime<Utc>,
) -> PaymentSummary {
    payments
        .iter()
        .fold(PaymentSummary::default(), |mut acc, row| {
            let input = PenaltyInput::from_row(row, default_penalty_per_day);
            let penalty = compute_penalty(&input, now);
            acc.count += 1;
            if input.status == PaymentStatus::Paid {
                acc.paid_total = acc.paid_total.saturating_add(row.amount);
            } else {
                acc.outstanding_total = acc.outstanding_total.saturating_add(penalty.total_due);
                acc.penalty_total = acc.penalty_total.saturating_add(penalty.penalty_amount);
            }
            if penalty.is_overdue {
                acc.overdue_count += 1;
            } else if is_due_soon(input.status, input.end_date, now) {
                acc.due_soon_count += 1;
            }
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    fn input(status: PaymentStatus, end: Option<DateTime<Utc>>) -> PenaltyInput {
        PenaltyInput {
            status,
            amount: 100_000,
            end_date: end,
            penalty_per_day: 10_000,
        }
    }

    fn row(status: &str, amount: i64, end: Option<DateTime<Utc>>) -> PaymentRow {
        PaymentRow {
            id: Uuid::new_v4(),
            admin_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            amount,
            status: status.to_string(),
            start_date: None,
            end_date: end,
            due_date: None,
            penalty_per_day: None,
            paid_at: None,
            note: None,
            created_at: now(),
        }
    }

    #[test]
    fn test_paid_never_accrues() {
        let p = compute_penalty(
            &input(PaymentStatus::Paid, Some(now() - Duration::days(1))),
            now(),
        );
        assert_eq!(p.penalty_amount, 0);
        assert_eq!(p.total_due, 100_000);
        assert!(!p.is_overdue);
        assert_eq!(p.display_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_five_days_late() {
        let p = compute_penalty(
            &input(PaymentStatus::Pending, Some(now() - Duration::days(5))),
            now(),
        );
        assert_eq!(p.overdue_days, 5);
        assert_eq!(p.penalty_amount, 50_000);
        assert_eq!(p.total_due, 150_000);
        assert!(p.is_overdue);
        assert_eq!(p.display_status, PaymentStatus::Overdue);
    }

    #[test]
    fn test_boundary_is_not_overdue() {
        let p = compute_penalty(&input(PaymentStatus::Pending, Some(now())), now());
        assert!(!p.is_overdue);
        assert_eq!(p.overdue_days, 0);
        assert_eq!(p.display_status, PaymentStatus::Pending);
    }

    #[test]
    fn test_partial_day_counts_as_one() {
        let p = compute_penalty(
            &input(PaymentStatus::Pending, Some(now() - Duration::hours(1))),
            now(),
        );
        assert_eq!(p.overdue_days, 1);
        assert_eq!(p.penalty_amount, 10_000);
    }

    #[test]
    fn test_floor_of_partial_days() {
        let p = compute_penalty(
            &input(
                PaymentStatus::Pending,
                Some(now() - Duration::days(2) - Duration::hours(23)),
            ),
            now(),
        );
        assert_eq!(p.overdue_days, 2);
    }

    #[test]
    fn test_no_end_date_no_penalty() {
        let p = compute_penalty(&input(PaymentStatus::Pending, None), now());
        assert!(!p.is_overdue);
        assert_eq!(p.total_due, 100_000);
    }

    #[test]
    fn test_manual_overdue_before_end_reads_as_stored() {
        let p = compute_penalty(
            &input(PaymentStatus::Overdue, Some(now() + Duration::days(2))),
            now(),
        );
        assert!(!p.is_overdue);
        assert_eq!(p.display_status, PaymentStatus::Overdue);
    }

    #[test]
    fn test_huge_values_saturate() {
        let mut i = input(PaymentStatus::Pending, Some(now() - Duration::days(10)));
        i.penalty_per_day = i64::MAX;
        let p = compute_penalty(&i, now());
        assert_eq!(p.penalty_amount, i64::MAX);
        assert_eq!(p.total_due, i64::MAX);
    }

    #[test]
    fn test_from_row_falls_back_to_due_date_and_default_rate() {
        let mut r = row("pending", 100_000, None);
        r.due_date = Some(now() - Duration::days(3));
        let i = PenaltyInput::from_row(&r, 5_000);
        assert_eq!(i.end_date, r.due_date);
        assert_eq!(compute_penalty(&i, now()).penalty_amount, 15_000);
    }

    #[test]
    fn test_due_soon_two_days() {
        assert!(is_due_soon(
            PaymentStatus::Pending,
            Some(now() + Duration::days(2)),
            now()
        ));
    }

    #[test]
    fn test_due_soon_four_days_is_not_flagged() {
        assert!(!is_due_soon(
            PaymentStatus::Pending,
            Some(now() + Duration::days(4)),
            now()
        ));
    }

    #[test]
    fn test_due_soon_window_edges_are_inclusive() {
        let pending = PaymentStatus::Pending;
        assert!(is_due_soon(pending, Some(now() + Duration::days(3)), now()));
        assert!(is_due_soon(pending, Some(now()), now()));
        assert!(!is_due_soon(
            pending,
            Some(now() + Duration::days(3) + Duration::seconds(1)),
            now()
        ));
    }

    #[test]
    fn test_paid_never_due_soon() {
        for offset in [-5, 0, 1, 3, 10] {
            assert!(!is_due_soon(
                PaymentStatus::Paid,
                Some(now() + Duration::days(offset)),
                now()
            ));
        }
    }

    #[test]
    fn test_days_until_rounds_up() {
        assert_eq!(days_until(now() + Duration::hours(36), now()), 2);
        assert_eq!(days_until(now() + Duration::days(3), now()), 3);
        assert_eq!(days_until(now() - Duration::days(2), now()), -2);
    }

    #[test]
    fn test_summarize_mixed() {
        let rows = vec![
            row("paid", 200_000, Some(now() - Duration::days(10))),
            row("pending", 100_000, Some(now() - Duration::days(5))),
            row("pending", 50_000, Some(now() + Duration::days(2))),
        ];
        let s = summarize(&rows, 10_000, now());
        assert_eq!(s.count, 3);
        assert_eq!(s.paid_total, 200_000);
        assert_eq!(s.penalty_total, 50_000);
        assert_eq!(s.outstanding_total, 150_000 + 50_000);
        assert_eq!(s.overdue_count, 1);
        assert_eq!(s.due_soon_count, 1);
    }
}
