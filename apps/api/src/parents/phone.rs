/// Subscriber numbers are compared on their last nine digits so that
/// `+998 90 123 45 67`, `998901234567` and `901234567` all match.
pub const SUBSCRIBER_DIGITS: usize = 9;

pub fn digits(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// The trailing subscriber digits, if the number is long enough to compare.
pub fn subscriber_suffix(phone: &str) -> Option<String> {
    let d = digits(phone);
    (d.len() >= SUBSCRIBER_DIGITS).then(|| d[d.len() - SUBSCRIBER_DIGITS..].to_string())
}

pub fn phones_match(a: &str, b: &str) -> bool {
    let (da, db) = (digits(a), digits(b));
    if da.is_empty() || db.is_empty() {
        return false;
    }
    if da == db {
        return true;
    }
    matches!(
        (subscriber_suffix(&da), subscriber_suffix(&db)),
        (Some(x), Some(y)) if x == y
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits_strips_formatting() {
        assert_eq!(digits("+998 (90) 123-45-67"), "998901234567");
    }

    #[test]
    fn test_match_with_and_without_country_code() {
        assert!(phones_match("+998 90 123 45 67", "901234567"));
        assert!(phones_match("998901234567", "+998901234567"));
    }

    #[test]
    fn test_short_numbers_need_exact_match() {
        assert!(phones_match("1234", "12-34"));
        assert!(!phones_match("1234", "91234"));
    }

    #[test]
    fn test_empty_never_matches() {
        assert!(!phones_match("", ""));
        assert!(!phones_match("abc", "+998901234567"));
    }

    #[test]
    fn test_different_numbers() {
        assert!(!phones_match("+998901234567", "+998901234568"));
    }
}
