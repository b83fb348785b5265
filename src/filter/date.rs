//! `MM-DD-YYYY` date queries against stored post timestamps.
//!
//! Both sides are shifted by a fixed +8h and truncated to midnight UTC, giving
//! a "UTC+8 calendar day". This is fixed-offset arithmetic, not a time zone
//! conversion.

use crate::error::{ListingError, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static DATE_QUERY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}-\d{1,2}-\d{4}$").expect("valid date regex"));

const UTC8_OFFSET_MS: i64 = 8 * 60 * 60 * 1000;

/// A stored `{seconds, nanoseconds}` timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredTimestamp {
    pub seconds: i64,
    pub nanoseconds: i64,
}

impl StoredTimestamp {
    /// Accepts both the exported (`_seconds`) and plain (`seconds`) key styles.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let pick = |a: &str, b: &str| obj.get(a).or_else(|| obj.get(b)).and_then(Value::as_i64);
        Some(Self {
            seconds: pick("_seconds", "seconds")?,
            nanoseconds: pick("_nanoseconds", "nanoseconds").unwrap_or(0),
        })
    }

    /// Milliseconds since the epoch, fractional part truncated toward zero.
    pub fn to_millis(&self) -> i64 {
        (self.seconds as f64 * 1000.0 + self.nanoseconds as f64 / 1_000_000.0).trunc() as i64
    }
}

/// Shift by +8h and zero the time of day.
pub fn utc8_day_start(millis: i64) -> Option<DateTime<Utc>> {
    let shifted = DateTime::<Utc>::from_timestamp_millis(millis.checked_add(UTC8_OFFSET_MS)?)?;
    Some(shifted.date_naive().and_hms_opt(0, 0, 0)?.and_utc())
}

/// Calendar arithmetic with overflow: month 13 is January of the next year,
/// day 0 is the last day of the previous month, two-digit years are 19xx.
fn utc_date_with_overflow(year: i64, month: i64, day: i64) -> Option<NaiveDate> {
    let year = if (0..=99).contains(&year) { 1900 + year } else { year };
    let total_months = year.checked_mul(12)?.checked_add(month - 1)?;
    let y = i32::try_from(total_months.div_euclid(12)).ok()?;
    let m = u32::try_from(total_months.rem_euclid(12) + 1).ok()?;
    let first = NaiveDate::from_ymd_opt(y, m, 1)?;
    first.checked_add_signed(Duration::days(day - 1))
}

/// Reference instant for a date query.
///
/// Fails with [`ListingError::InvalidDateFormat`] unless the query is
/// `M-D-YYYY` with one- or two-digit month and day.
pub fn parse_query_date(query: &str) -> Result<DateTime<Utc>> {
    let invalid = || ListingError::InvalidDateFormat(query.to_string());
    if !DATE_QUERY.is_match(query) {
        return Err(invalid());
    }

    let mut parts = query.split('-').map(|p| p.parse::<i64>());
    let (Some(Ok(month)), Some(Ok(day)), Some(Ok(year))) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };

    let date = utc_date_with_overflow(year, month, day).ok_or_else(invalid)?;
    let millis = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?.and_utc().timestamp_millis();
    utc8_day_start(millis).ok_or_else(invalid)
}

/// Whether a stored timestamp falls on the reference day.
pub fn matches_day(reference: DateTime<Utc>, stored: &Value) -> bool {
    StoredTimestamp::from_value(stored)
        .and_then(|ts| utc8_day_start(ts.to_millis()))
        .is_some_and(|day| day == reference)
}
