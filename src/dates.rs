//! Date normalization for coupon validity windows.
//!
//! Stored validity dates use the canonical `dd/mm/yyyy` form. Input arrives in
//! several shapes (spreadsheet serial numbers, slash dates, ISO dates, long-form
//! text), and every write path funnels it through [`parse_flexible_date`].
//!
//! The slash form is always read as day/month. The month/day reading exists only
//! in [`format_for_display_or_fallback`], which renders historical values that may
//! have been stored inconsistently.

use std::sync::LazyLock;

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use regex::Regex;
use thiserror::Error;

pub type CalendarDate = NaiveDate;

/// Serial numbers at or below this value (1970-01-01) are not treated as dates.
pub const SERIAL_DATE_THRESHOLD: f64 = 25569.0;

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

static SLASH_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("valid slash date regex"));

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("valid iso date regex"));

const TEXT_DATE_FORMATS: &[&str] = &[
    "%Y/%m/%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%A, %B %d, %Y",
];

const TEXT_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date: {0}")]
pub struct InvalidDate(pub String);

/// Raw date value as it arrives from a form, a stored record or a spreadsheet cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DateInput<'a> {
    Serial(f64),
    Text(&'a str),
}

impl<'a> From<&'a str> for DateInput<'a> {
    fn from(value: &'a str) -> Self {
        DateInput::Text(value)
    }
}

impl From<f64> for DateInput<'_> {
    fn from(value: f64) -> Self {
        DateInput::Serial(value)
    }
}

/// Parse any supported date representation, reading slash dates as dd/mm/yyyy.
pub fn parse_flexible_date<'a>(input: impl Into<DateInput<'a>>) -> Result<CalendarDate, InvalidDate> {
    match input.into() {
        DateInput::Serial(n) => {
            if n > SERIAL_DATE_THRESHOLD {
                from_serial(n).ok_or_else(|| InvalidDate(n.to_string()))
            } else {
                Err(InvalidDate(n.to_string()))
            }
        }
        DateInput::Text(raw) => {
            let text = raw.trim();
            if text.is_empty() {
                return Err(InvalidDate(raw.to_string()));
            }

            if let Ok(n) = text.parse::<f64>() {
                if n > SERIAL_DATE_THRESHOLD {
                    return from_serial(n).ok_or_else(|| InvalidDate(raw.to_string()));
                }
            }

            if let Some(caps) = SLASH_DATE.captures(text) {
                let day = caps[1].parse().unwrap_or(0);
                let month = caps[2].parse().unwrap_or(0);
                let year = caps[3].parse().unwrap_or(0);
                return checked_date(year, month, day).ok_or_else(|| InvalidDate(raw.to_string()));
            }

            if let Some(date) = parse_iso(text) {
                return Ok(date);
            }
            if ISO_DATE.is_match(text) {
                return Err(InvalidDate(raw.to_string()));
            }

            parse_text(text).ok_or_else(|| InvalidDate(raw.to_string()))
        }
    }
}

/// Render a date in the canonical `dd/mm/yyyy` form.
pub fn format_canonical(date: CalendarDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Render a date in long form, e.g. `June 15, 2024`.
pub fn format_long(date: CalendarDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Best-effort display formatting for stored dates.
///
/// Returns `None` for blank input. Values that cannot be read at all come back
/// unchanged, so this never fails.
pub fn format_for_display_or_fallback(input: &str) -> Option<String> {
    let text = input.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = SLASH_DATE.captures(text) {
        let first: u32 = caps[1].parse().unwrap_or(0);
        let second: u32 = caps[2].parse().unwrap_or(0);
        let year: i32 = caps[3].parse().unwrap_or(0);

        if let Some(date) = checked_date(year, second, first) {
            return Some(format_canonical(date));
        }
        // legacy month/day rows
        if let Some(date) = checked_date(year, first, second) {
            return Some(format_canonical(date));
        }
        return Some(input.to_string());
    }

    parse_iso(text)
        .or_else(|| parse_text(text))
        .map(format_canonical)
        .or_else(|| Some(input.to_string()))
}

/// Convert a stored date into the `yyyy-mm-dd` form used by date pickers.
/// Returns an empty string when the value cannot be read.
pub fn to_input_format(stored: &str) -> String {
    let text = stored.trim();
    if text.is_empty() {
        return String::new();
    }

    let date = parse_flexible_date(text).ok().or_else(|| {
        format_for_display_or_fallback(text).and_then(|display| parse_flexible_date(display.as_str()).ok())
    });

    date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

/// Convert a date picker value back into the canonical form.
/// Unreadable values are returned unchanged.
pub fn from_input_format(value: &str) -> String {
    if value.trim().is_empty() {
        return String::new();
    }
    match parse_flexible_date(value) {
        Ok(date) => format_canonical(date),
        Err(_) => value.to_string(),
    }
}

fn from_serial(n: f64) -> Option<CalendarDate> {
    if !n.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(Days::new(n.floor() as u64))
}

fn checked_date(year: i32, month: u32, day: u32) -> Option<CalendarDate> {
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) || !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_iso(text: &str) -> Option<CalendarDate> {
    let caps = ISO_DATE.captures(text)?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_text(text: &str) -> Option<CalendarDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.date_naive());
    }
    for format in TEXT_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }
    TEXT_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}
