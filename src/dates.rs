use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}").unwrap());
static ORDINAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").unwrap());
static RELATIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(today|tomorrow|yesterday)\b[,\s]*").unwrap());
static WEEKDAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(mon|tue|tues|wed|thu|thur|thurs|fri|sat|sun)[a-z]*\.?,?\s+").unwrap()
});
static SEPT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bSept\b").unwrap());
static BARE_HOUR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})(AM|PM)$").unwrap());
static RANGE_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*(\bto\b|-|–|—)\s*").unwrap());

// Tried only when the text carries a four-digit year.
const DATE_FORMATS: &[&str] = &[
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
];

const SHORT_YEAR_FORMATS: &[&str] = &["%m/%d/%y", "%m-%d-%y"];

const TIME_FORMATS: &[&str] = &["%I:%M%p", "%H:%M", "%H%M", "%H:%M:%S"];

/// Split a listing blob after the first four-digit year.
///
/// "Wednesday, January 3, 2024 7:00pm to 8:30pm" becomes
/// ("Wednesday, January 3, 2024", "7:00pm to 8:30pm"). Returns `None` when
/// no year is present.
pub fn split_at_year(blob: &str) -> Option<(&str, &str)> {
    let m = YEAR_RE.find(blob)?;
    Some((blob[..m.end()].trim(), blob[m.end()..].trim()))
}

/// Lenient English date parse for headers like "Wednesday, January 3, 2024",
/// "Jan 3rd, 2024", "1/3/24" or "2024-01-03".
///
/// Text without a year is resolved against `default_year` when given.
pub fn parse_date(text: &str, default_year: Option<i32>) -> Option<NaiveDate> {
    let cleaned = normalize_date_text(text);
    if cleaned.is_empty() {
        return None;
    }

    if YEAR_RE.is_match(&cleaned) {
        return try_formats(&cleaned, DATE_FORMATS);
    }
    if let Some(d) = try_formats(&cleaned, SHORT_YEAR_FORMATS) {
        return Some(d);
    }

    let year = default_year?;
    let with_year = if cleaned.contains('/') {
        format!("{}/{}", cleaned, year)
    } else {
        format!("{}, {}", cleaned.trim_end_matches(','), year)
    };
    try_formats(&with_year, DATE_FORMATS)
}

/// Parse the start of a time range such as "7:00pm to 8:30pm", "1430" or "noon".
pub fn parse_time(text: &str) -> Option<NaiveTime> {
    let trimmed = text.trim();
    let start = RANGE_SPLIT_RE.split(trimmed).next()?.trim();
    let compact: String = start
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect::<String>()
        .to_uppercase();

    match compact.as_str() {
        "" => return None,
        "NOON" => return NaiveTime::from_hms_opt(12, 0, 0),
        "MIDNIGHT" => return NaiveTime::from_hms_opt(0, 0, 0),
        _ => {}
    }

    // Ranges like "7-8:30pm" carry the meridiem only on the end.
    let compact = if !compact.ends_with('M') && range_is_pm(trimmed) {
        format!("{}PM", compact)
    } else {
        compact
    };
    // chrono needs minutes: "7PM" -> "7:00PM"
    let compact = BARE_HOUR_RE.replace(&compact, "${1}:00${2}");

    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&compact, fmt).ok())
}

pub fn combine(date: NaiveDate, time: Option<NaiveTime>) -> NaiveDateTime {
    date.and_time(time.unwrap_or_default())
}

/// "Wednesday, January 03, 2024"
pub fn display_date(date: NaiveDate) -> String {
    date.format("%A, %B %d, %Y").to_string()
}

fn range_is_pm(text: &str) -> bool {
    let lower = text.to_lowercase();
    let has_range = RANGE_SPLIT_RE.is_match(&lower);
    has_range && lower.trim_end().ends_with("pm") && !lower.contains("am")
}

fn normalize_date_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let no_relative = RELATIVE_RE.replace(&collapsed, "");
    let no_weekday = WEEKDAY_RE.replace(&no_relative, "");
    let no_ordinal = ORDINAL_RE.replace_all(&no_weekday, "$1");
    SEPT_RE
        .replace_all(&no_ordinal, "Sep")
        .replace('.', "")
        .trim()
        .trim_end_matches(',')
        .to_string()
}

fn try_formats(text: &str, formats: &[&str]) -> Option<NaiveDate> {
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}
