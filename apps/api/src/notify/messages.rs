// Parent-facing notification texts.

use chrono::{DateTime, NaiveDate, Utc};

/// Formats an amount with space-separated thousands: `150000` → `150 000`.
pub fn format_amount(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

fn format_day(date: DateTime<Utc>) -> String {
    date.format("%d.%m.%Y").to_string()
}

pub fn payment_created(student_name: &str, amount: i64, due: Option<DateTime<Utc>>) -> String {
    match due {
        Some(due) => format!(
            "New payment for {student_name}: {} due by {}.",
            format_amount(amount),
            format_day(due)
        ),
        None => format!("New payment for {student_name}: {}.", format_amount(amount)),
    }
}

pub fn payment_received(student_name: &str, amount: i64) -> String {
    format!(
        "Payment of {} for {student_name} has been received. Thank you!",
        format_amount(amount)
    )
}

pub fn payment_due_soon(student_name: &str, amount: i64, days_left: i64) -> String {
    let when = match days_left {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        n => format!("in {n} days"),
    };
    format!(
        "Reminder: the payment of {} for {student_name} is due {when}.",
        format_amount(amount)
    )
}

pub fn payment_overdue(student_name: &str, overdue_days: i64, penalty: i64, total: i64) -> String {
    format!(
        "The payment for {student_name} is {overdue_days} day(s) overdue. \
         Late fee: {}. Total due: {}.",
        format_amount(penalty),
        format_amount(total)
    )
}

pub fn absence(student_name: &str, date: NaiveDate) -> String {
    format!(
        "{student_name} was absent from class on {}.",
        date.format("%d.%m.%Y")
    )
}

pub fn new_score(student_name: &str, score_type: &str, overall_percent: f64) -> String {
    format!("New {score_type} result for {student_name}: {overall_percent:.1}%.")
}

pub fn telegram_linked(parent_names: &[String]) -> String {
    format!(
        "You are subscribed to notifications for: {}.",
        parent_names.join(", ")
    )
}

pub const TELEGRAM_NOT_FOUND: &str =
    "No parent account uses this phone number. Please check it with the school office.";

pub const TELEGRAM_USAGE: &str =
    "Send /start followed by your phone number, e.g. /start +998901234567";

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(999), "999");
        assert_eq!(format_amount(1000), "1 000");
        assert_eq!(format_amount(150_000), "150 000");
        assert_eq!(format_amount(1_234_567), "1 234 567");
        assert_eq!(format_amount(-25_000), "-25 000");
    }

    #[test]
    fn test_payment_created_with_due_date() {
        let due = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap();
        assert_eq!(
            payment_created("Aziz", 400_000, Some(due)),
            "New payment for Aziz: 400 000 due by 01.09.2026."
        );
    }

    #[test]
    fn test_due_soon_wording() {
        assert!(payment_due_soon("A", 1, 0).ends_with("due today."));
        assert!(payment_due_soon("A", 1, 1).ends_with("due tomorrow."));
        assert!(payment_due_soon("A", 1, 3).ends_with("due in 3 days."));
    }

    #[test]
    fn test_new_score_rounds() {
        assert_eq!(
            new_score("Lola", "mock", 87.456),
            "New mock result for Lola: 87.5%."
        );
    }
}
