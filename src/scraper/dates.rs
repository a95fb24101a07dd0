//! Lenient publication-date parsing for listing rows.
//!
//! Listing rows show dates in several shapes ("12 March 2024", "12/03/2024", "2024-03-12",
//! "Tuesday, 12th March 2024", "3 days ago"). Numeric dates are read day-first.

use chrono::{Datelike, DateTime, Days, NaiveDate};

/// Date text used when a listing row carries no date element at all.
pub const SENTINEL_DATE_TEXT: &str = "2000-01-01";

/// chrono's `%Y` accepts short years and a format space matches no input, so "March 2024" would
/// otherwise read as March 20 of year 24. Anything before this year is a misparse.
const MIN_YEAR: i32 = 1000;

const FORMATS: [&str; 11] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%d-%m-%Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d-%b-%Y",
    "%Y.%m.%d",
];

const WEEKDAYS: [&str; 14] = [
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday", "mon", "tue",
    "wed", "thu", "fri", "sat", "sun",
];

/// Parse a human-written date. `today` anchors relative forms ("yesterday", "2 weeks ago").
pub fn parse_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let text = strip_label(text.trim());
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }

    let lower = text.to_lowercase();
    if let Some(date) = parse_relative(&lower, today) {
        return Some(date);
    }

    let cleaned = normalize_tokens(&lower);
    if let Some(date) = parse_month_year(&cleaned) {
        return Some(date);
    }
    if let Some(date) = parse_absolute(&cleaned) {
        return Some(date);
    }

    // "12 March 2024 10:30" / "12/03/2024 - 10:30"
    let date_part = cleaned
        .split_whitespace()
        .take_while(|t| !t.contains(':') && *t != "-" && *t != "|")
        .collect::<Vec<_>>()
        .join(" ");
    if date_part != cleaned {
        if let Some(date) = parse_absolute(&date_part) {
            return Some(date);
        }
    }
    None
}

/// "March 2024" reads as the first of the month.
fn parse_month_year(s: &str) -> Option<NaiveDate> {
    let tokens: Vec<&str> = s.split_whitespace().collect();
    let [month, year] = tokens.as_slice() else {
        return None;
    };
    if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(&format!("1 {} {}", month, year), "%d %B %Y").ok()
}

fn parse_absolute(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    FORMATS
        .iter()
        .filter_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .find(|d| d.year() >= MIN_YEAR)
}

/// Drop a leading "Published:" style label; leaves times such as "10:30" alone.
fn strip_label(s: &str) -> &str {
    match s.split_once(':') {
        Some((label, rest))
            if !label.is_empty()
                && label.chars().all(|c| c.is_alphabetic() || c.is_whitespace()) =>
        {
            rest.trim()
        }
        _ => s,
    }
}

/// Lowercased tokens with weekday names removed and ordinal suffixes ("12th") stripped.
fn normalize_tokens(lower: &str) -> String {
    let mut tokens: Vec<String> = lower
        .split_whitespace()
        .map(|t| {
            let (core, trailing_comma) = match t.strip_suffix(',') {
                Some(c) => (c, true),
                None => (t, false),
            };
            let core = strip_ordinal(core);
            if trailing_comma {
                format!("{},", core)
            } else {
                core.to_string()
            }
        })
        .collect();
    if let Some(first) = tokens.first() {
        if WEEKDAYS.contains(&first.trim_end_matches(',')) {
            tokens.remove(0);
        }
    }
    tokens.join(" ")
}

fn strip_ordinal(token: &str) -> &str {
    for suffix in ["st", "nd", "rd", "th"] {
        if let Some(num) = token.strip_suffix(suffix) {
            if !num.is_empty() && num.chars().all(|c| c.is_ascii_digit()) {
                return num;
            }
        }
    }
    token
}

fn parse_relative(lower: &str, today: NaiveDate) -> Option<NaiveDate> {
    match lower {
        "today" | "now" | "just now" => return Some(today),
        "yesterday" => return today.checked_sub_days(Days::new(1)),
        _ => {}
    }
    let tokens: Vec<&str> = lower.split_whitespace().collect();
    let [amount, unit, "ago"] = tokens.as_slice() else {
        return None;
    };
    let amount: u64 = match *amount {
        "a" | "an" | "one" => 1,
        n => n.parse().ok()?,
    };
    let days = match unit.trim_end_matches('s') {
        "day" => amount,
        "week" => amount.checked_mul(7)?,
        _ => return None,
    };
    today.checked_sub_days(Days::new(days))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        ymd(2024, 6, 15)
    }

    #[test]
    fn sentinel_text_parses_to_its_date() {
        assert_eq!(parse_date(SENTINEL_DATE_TEXT, today()), Some(ymd(2000, 1, 1)));
    }

    #[test]
    fn parses_common_listing_shapes() {
        let cases = [
            ("12 March 2024", ymd(2024, 3, 12)),
            ("12 Mar 2024", ymd(2024, 3, 12)),
            ("March 12, 2024", ymd(2024, 3, 12)),
            ("12/03/2024", ymd(2024, 3, 12)),
            ("12.03.2024", ymd(2024, 3, 12)),
            ("2024-03-12", ymd(2024, 3, 12)),
            ("Tuesday, 12th March 2024", ymd(2024, 3, 12)),
            ("  1 February   2023 ", ymd(2023, 2, 1)),
            ("March 2024", ymd(2024, 3, 1)),
            ("June 2023", ymd(2023, 6, 1)),
            ("Sep 2022", ymd(2022, 9, 1)),
        ];
        for (text, expected) in cases {
            assert_eq!(parse_date(text, today()), Some(expected), "input {:?}", text);
        }
    }

    #[test]
    fn ignores_label_and_time() {
        assert_eq!(parse_date("Published: 5 July 2023", today()), Some(ymd(2023, 7, 5)));
        assert_eq!(parse_date("05/07/2023 - 10:30", today()), Some(ymd(2023, 7, 5)));
        assert_eq!(
            parse_date("2023-07-05T10:30:00+02:00", today()),
            Some(ymd(2023, 7, 5))
        );
    }

    #[test]
    fn relative_dates_anchor_on_today() {
        assert_eq!(parse_date("today", today()), Some(today()));
        assert_eq!(parse_date("Yesterday", today()), Some(ymd(2024, 6, 14)));
        assert_eq!(parse_date("3 days ago", today()), Some(ymd(2024, 6, 12)));
        assert_eq!(parse_date("2 weeks ago", today()), Some(ymd(2024, 6, 1)));
        assert_eq!(parse_date("a day ago", today()), Some(ymd(2024, 6, 14)));
    }

    #[test]
    fn month_and_year_is_not_read_as_day_and_short_year() {
        let parsed = parse_date("March 2024", today());
        assert_eq!(parsed, Some(ymd(2024, 3, 1)));
        assert_ne!(parsed, Some(ymd(24, 3, 20)));
    }

    #[test]
    fn two_digit_years_are_rejected() {
        assert_eq!(parse_date("12/03/24", today()), None);
        assert_eq!(parse_date("12 March 24", today()), None);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_date("", today()), None);
        assert_eq!(parse_date("not a date", today()), None);
        assert_eq!(parse_date("32/13/2024", today()), None);
        assert_eq!(parse_date("Guidance", today()), None);
    }
}
