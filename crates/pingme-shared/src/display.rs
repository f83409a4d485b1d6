//! Small text helpers for rendering thread and message summaries.

use chrono::{DateTime, Utc};

use crate::constants::DEFAULT_INITIALS;

/// Up to two upper-case initials taken from the words of `label`.
pub fn initials(label: &str) -> String {
    let letters: String = label
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .take(2)
        .collect();

    if letters.is_empty() {
        DEFAULT_INITIALS.to_string()
    } else {
        letters
    }
}

/// Relative timestamp: clock time within a day, "Yesterday" within two days,
/// otherwise a short date such as "Jan 5".
pub fn time_label(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let hours = (now - at).num_hours();
    if hours < 24 {
        at.format("%H:%M").to_string()
    } else if hours < 48 {
        "Yesterday".to_string()
    } else {
        at.format("%b %-d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_initials() {
        assert_eq!(initials("Direct Chat"), "DC");
        assert_eq!(initials("ana maria lopez"), "AM");
        assert_eq!(initials("Ben"), "B");
        assert_eq!(initials("   "), DEFAULT_INITIALS);
    }

    #[test]
    fn test_time_label() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 18, 30, 0).unwrap();
        assert_eq!(time_label(now - Duration::minutes(20), now), "18:10");
        assert_eq!(time_label(now - Duration::hours(30), now), "Yesterday");
        assert_eq!(
            time_label(Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap(), now),
            "Jan 5"
        );
    }
}
