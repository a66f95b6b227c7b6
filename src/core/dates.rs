//! Day-granularity date handling shared by every view.
//!
//! All comparisons happen on `NaiveDate` in the caller's local time zone, so
//! time-of-day never affects whether something is "today" or "upcoming".

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, Weekday};
use regex::Regex;
use thiserror::Error;

static DISPLAY_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<day>\d{2})/(?P<month>\d{2})/(?P<year>\d{4})$").unwrap()
});

static STORAGE_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})").unwrap()
});

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Oldest year accepted when a display date is converted for storage.
pub const MIN_DISPLAY_YEAR: i32 = 1900;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DisplayDateError {
    #[error("expected a DD/MM/YYYY date")]
    InvalidFormat,
    #[error("day, month or year out of range")]
    OutOfRange,
    #[error("not a calendar date")]
    InvalidDate,
}

impl DisplayDateError {
    /// Translation key shown to the user.
    pub fn notice_key(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "DATE.ERROR_INVALID_FORMAT",
            Self::OutOfRange => "DATE.ERROR_OUT_OF_RANGE",
            Self::InvalidDate => "DATE.ERROR_INVALID",
        }
    }
}

/// Today's date in the local time zone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a backend date string down to its local calendar day.
///
/// Accepts bare `YYYY-MM-DD`, naive ISO-8601 date-times and RFC 3339
/// timestamps with an offset (converted to local time first).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).date_naive());
    }
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

/// Whole days from `reference` until `target`, never negative.
///
/// Returns `None` when `target` doesn't parse. A date in the past counts as
/// zero days away.
pub fn days_until(reference: NaiveDate, target: &str) -> Option<i64> {
    let target = parse_date(target)?;
    Some((target - reference).num_days().max(0))
}

pub fn is_same_day(a: NaiveDateTime, b: NaiveDateTime) -> bool {
    a.date() == b.date()
}

/// Whether a raw date string falls on `reference`. Unparsable dates are
/// never today.
pub fn is_on_day(raw: &str, reference: NaiveDate) -> bool {
    parse_date(raw) == Some(reference)
}

pub fn format_display_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Strict `DD/MM/YYYY` parse, reporting why a string was rejected.
pub fn parse_display_date_checked(s: &str) -> Result<NaiveDate, DisplayDateError> {
    let caps = DISPLAY_DATE_RE
        .captures(s)
        .ok_or(DisplayDateError::InvalidFormat)?;
    // The regex guarantees all-digit captures of bounded width.
    let day: u32 = caps["day"].parse().map_err(|_| DisplayDateError::InvalidFormat)?;
    let month: u32 = caps["month"].parse().map_err(|_| DisplayDateError::InvalidFormat)?;
    let year: i32 = caps["year"].parse().map_err(|_| DisplayDateError::InvalidFormat)?;

    if day < 1 || month < 1 || month > 12 {
        return Err(DisplayDateError::OutOfRange);
    }
    NaiveDate::from_ymd_opt(year, month, day).ok_or(DisplayDateError::InvalidDate)
}

/// Strict `DD/MM/YYYY` parse. `None` on any mismatch, including dates like
/// `31/02/2024` that match the format but don't exist.
pub fn parse_display_date(s: &str) -> Option<NaiveDate> {
    parse_display_date_checked(s).ok()
}

/// Render a stored date for display. Strings that start with `YYYY-MM-DD`
/// are rearranged as-is; anything else goes through [`parse_date`]. Returns
/// an empty string when nothing usable is found.
pub fn storage_to_display(raw: &str) -> String {
    if let Some(caps) = STORAGE_PREFIX_RE.captures(raw) {
        return format!("{}/{}/{}", &caps["day"], &caps["month"], &caps["year"]);
    }
    parse_date(raw).map(format_display_date).unwrap_or_default()
}

/// Convert a user-entered `DD/MM/YYYY` date to the backend's storage form
/// (local midnight, `YYYY-MM-DDT00:00:00`). Years before
/// [`MIN_DISPLAY_YEAR`] are rejected.
pub fn display_to_storage(s: &str) -> Result<String, DisplayDateError> {
    let date = parse_display_date_checked(s)?;
    if date.year() < MIN_DISPLAY_YEAR {
        return Err(DisplayDateError::OutOfRange);
    }
    Ok(format!("{}T00:00:00", date.format("%Y-%m-%d")))
}

pub fn day_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
