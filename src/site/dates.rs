//! Loose parsing of the date strings sites print next to updates
//!
//! Relative forms resolve against the date the document was fetched, so
//! parsing stays a pure function of the document.

use chrono::{Duration, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

static RELATIVE_DATE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+)\s+(minute|hour|day|week)s?\s+ago$").ok());

const ABSOLUTE_FORMATS: &[&str] = &["%b %d, %Y", "%b %d,%Y", "%m/%d/%Y", "%Y-%m-%d", "%d %b %Y"];

/// Parses `text` into a date, `None` if no known form matches
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use tankobon::site::parse_loose_date;
///
/// let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
/// assert_eq!(parse_loose_date("Yesterday", today), NaiveDate::from_ymd_opt(2024, 3, 9));
/// assert_eq!(parse_loose_date("Mar 01, 2024", today), NaiveDate::from_ymd_opt(2024, 3, 1));
/// ```
pub fn parse_loose_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return None;
    }

    match text.to_ascii_lowercase().as_str() {
        "today" | "just now" => return Some(today),
        "yesterday" => return today.pred_opt(),
        _ => {}
    }

    if let Some(date) = parse_relative(&text, today) {
        return Some(date);
    }

    ABSOLUTE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&text, fmt).ok())
}

/// `N minutes/hours/days/weeks ago`, `None` when the offset leaves the
/// calendar
fn parse_relative(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let caps = RELATIVE_DATE.as_ref()?.captures(text)?;
    let amount: i64 = caps.get(1)?.as_str().parse().ok()?;

    let days = match caps.get(2)?.as_str().to_ascii_lowercase().as_str() {
        // Sub-day offsets never move the date.
        "minute" | "hour" => 0,
        "day" => amount,
        "week" => amount.checked_mul(7)?,
        _ => return None,
    };

    today.checked_sub_signed(Duration::try_days(days)?)
}
