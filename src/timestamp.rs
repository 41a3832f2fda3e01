//! Timestamp parsing and formatting for the three on-wire representations.
//!
//! Shapes declare at most one timestamp format; when none is declared the
//! codec settings and the member's HTTP binding decide (see
//! [`crate::codec::CodecSettings::timestamp_format_for`]). This module owns
//! the pure conversion functions between wire text and [`Timestamp`] values:
//!
//! | Format | Wire example |
//! |--------|--------------|
//! | `date-time` | `1985-04-12T23:20:50.520Z` |
//! | `http-date` | `Mon, 16 Dec 2019 23:48:18 GMT` |
//! | `epoch-seconds` | `1576540098` or `1576540098.52` |
//!
//! All parsers are strict: fields are range-validated (month 1-12, day 1-31,
//! hour 0-23, minute 0-59, second 0-60 to admit a leap second), four-digit
//! years are required for `date-time`, and fractional seconds are preserved
//! to millisecond precision. `http-date` accepts the three RFC 7231
//! sub-formats (IMF-fixdate, RFC 850, ANSI C asctime), selected by first
//! successful match.
//!
//! # Examples
//!
//! ```
//! use shapewire::timestamp::{parse_date_time, format_date_time};
//!
//! let ts = parse_date_time("1985-04-12T23:20:50.52Z").unwrap();
//! assert_eq!(format_date_time(ts), "1985-04-12T23:20:50.520Z");
//! ```

use crate::error::{CodecError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// A point in time, stored as milliseconds since the Unix epoch.
///
/// This is the in-memory representation every wire format converts to and
/// from. Sub-millisecond precision is not preserved by any of the three
/// formats, so milliseconds are the canonical resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    millis: i64,
}

impl Timestamp {
    /// Create a timestamp from milliseconds since the Unix epoch.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Timestamp { millis }
    }

    /// Create a timestamp from (possibly fractional) seconds since the epoch.
    ///
    /// The value is rounded to the nearest millisecond.
    #[must_use]
    pub fn from_secs_f64(secs: f64) -> Self {
        Timestamp {
            millis: (secs * 1000.0).round() as i64,
        }
    }

    /// Milliseconds since the Unix epoch.
    #[must_use]
    pub const fn millis(&self) -> i64 {
        self.millis
    }

    /// Seconds since the Unix epoch as a float, millisecond precision.
    #[must_use]
    pub fn as_secs_f64(&self) -> f64 {
        self.millis as f64 / 1000.0
    }
}

/// The on-wire representation declared for a timestamp shape.
///
/// A shape carries at most one of these; a member with no declared format
/// falls back to binding-driven resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampFormat {
    /// RFC 3339 with offset, e.g. `1985-04-12T23:20:50.520Z`.
    DateTime,
    /// RFC 7231, e.g. `Mon, 16 Dec 2019 23:48:18 GMT`.
    HttpDate,
    /// Seconds since the Unix epoch, optionally fractional.
    EpochSeconds,
}

impl TimestampFormat {
    /// Parse wire text in this format.
    pub fn parse(&self, text: &str) -> Result<Timestamp> {
        match self {
            TimestampFormat::DateTime => parse_date_time(text),
            TimestampFormat::HttpDate => parse_http_date(text),
            TimestampFormat::EpochSeconds => parse_epoch_seconds(text),
        }
    }

    /// Format a timestamp in this wire format.
    #[must_use]
    pub fn format(&self, ts: Timestamp) -> String {
        match self {
            TimestampFormat::DateTime => format_date_time(ts),
            TimestampFormat::HttpDate => format_http_date(ts),
            TimestampFormat::EpochSeconds => format_epoch_seconds(ts),
        }
    }
}

const MILLIS_PER_DAY: i64 = 86_400_000;

static DATE_TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{4})-(\d{2})-(\d{2})[Tt](\d{2}):(\d{2}):(\d{2})(?:\.(\d+))?(?:[Zz]|([+-])(\d{2}):(\d{2}))$",
    )
    .unwrap()
});

static IMF_FIXDATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:Mon|Tue|Wed|Thu|Fri|Sat|Sun), (\d{2}) (Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec) (\d{4}) (\d{2}):(\d{2}):(\d{2})(?:\.(\d+))? GMT$",
    )
    .unwrap()
});

static RFC_850_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday), (\d{2})-(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)-(\d{2}) (\d{2}):(\d{2}):(\d{2})(?:\.(\d+))? GMT$",
    )
    .unwrap()
});

static ASCTIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:Mon|Tue|Wed|Thu|Fri|Sat|Sun) (Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec) ( \d|\d{2}) (\d{2}):(\d{2}):(\d{2})(?:\.(\d+))? (\d{4})$",
    )
    .unwrap()
});

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Broken-down UTC fields produced by the strict parsers, before epoch
/// conversion. Seconds may legitimately be 60 (leap second); the epoch
/// arithmetic rolls that over into the next minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DateParts {
    year: i64,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    millis: u32,
}

impl DateParts {
    fn validate(self, raw: &str) -> Result<Self> {
        let ok = (1..=12).contains(&self.month)
            && (1..=31).contains(&self.day)
            && self.hour <= 23
            && self.minute <= 59
            && self.second <= 60;
        if ok {
            Ok(self)
        } else {
            Err(CodecError::TimestampParse(raw.to_string()))
        }
    }

    fn epoch_millis(&self) -> i64 {
        let days = days_from_civil(self.year, self.month, self.day);
        let secs =
            days * 86_400 + i64::from(self.hour) * 3_600 + i64::from(self.minute) * 60
                + i64::from(self.second);
        secs * 1_000 + i64::from(self.millis)
    }
}

// Howard Hinnant's civil-date algorithms, exact over the proleptic
// Gregorian calendar.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = (i64::from(month) + 9) % 12;
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if month <= 2 { y + 1 } else { y }, month, day)
}

fn weekday_from_days(days: i64) -> usize {
    // 1970-01-01 was a Thursday.
    ((days + 4).rem_euclid(7)) as usize
}

fn frac_to_millis(frac: Option<&str>) -> u32 {
    match frac {
        None => 0,
        Some(digits) => {
            let mut buf = [b'0'; 3];
            for (i, b) in digits.bytes().take(3).enumerate() {
                buf[i] = b;
            }
            // buf holds ASCII digits only, the regex guarantees it
            std::str::from_utf8(&buf).unwrap_or("0").parse().unwrap_or(0)
        }
    }
}

fn month_number(name: &str) -> u32 {
    MONTH_NAMES
        .iter()
        .position(|m| *m == name)
        .map(|i| i as u32 + 1)
        .unwrap_or(0)
}

// RFC 850 carries a two-digit year; values 70-99 belong to the 1900s and
// everything below the cutoff rolls into the 2000s.
fn full_year(two_digit: i64) -> i64 {
    if two_digit < 70 {
        2_000 + two_digit
    } else {
        1_900 + two_digit
    }
}

/// Parse an RFC 3339 `date-time` with offset.
///
/// Strict grammar: `YYYY-MM-DDThh:mm:ss[.frac](Z|±hh:mm)`. Four-digit years
/// are required by the pattern; shorter years are rejected. Offsets are
/// subtracted after UTC construction, and second 60 (leap second) is
/// accepted, rolling over arithmetically into the next minute.
///
/// # Examples
///
/// ```
/// use shapewire::timestamp::parse_date_time;
///
/// assert!(parse_date_time("1985-04-12T23:20:50.52Z").is_ok());
/// assert!(parse_date_time("85-04-12T23:20:50.52Z").is_err());
/// ```
pub fn parse_date_time(text: &str) -> Result<Timestamp> {
    let caps = DATE_TIME_REGEX
        .captures(text)
        .ok_or_else(|| CodecError::TimestampParse(text.to_string()))?;
    let field = |i: usize| caps.get(i).map(|m| m.as_str());
    let num = |i: usize| -> i64 { field(i).unwrap_or("0").parse().unwrap_or(0) };

    let parts = DateParts {
        year: num(1),
        month: num(2) as u32,
        day: num(3) as u32,
        hour: num(4) as u32,
        minute: num(5) as u32,
        second: num(6) as u32,
        millis: frac_to_millis(field(7)),
    }
    .validate(text)?;

    let mut epoch = parts.epoch_millis();
    if let Some(sign) = field(8) {
        let offset = (num(9) * 3_600 + num(10) * 60) * 1_000;
        if sign == "+" {
            epoch -= offset;
        } else {
            epoch += offset;
        }
    }
    Ok(Timestamp::from_millis(epoch))
}

/// Parse an RFC 7231 `http-date`.
///
/// Accepts the three sub-formats (IMF-fixdate, RFC 850 with two-digit year,
/// ANSI C asctime), selected by first successful pattern match. Field
/// ranges are validated the same way as for `date-time`.
pub fn parse_http_date(text: &str) -> Result<Timestamp> {
    let parts = if let Some(caps) = IMF_FIXDATE_REGEX.captures(text) {
        DateParts {
            year: caps[3].parse().unwrap_or(0),
            month: month_number(&caps[2]),
            day: caps[1].parse().unwrap_or(0),
            hour: caps[4].parse().unwrap_or(0),
            minute: caps[5].parse().unwrap_or(0),
            second: caps[6].parse().unwrap_or(0),
            millis: frac_to_millis(caps.get(7).map(|m| m.as_str())),
        }
    } else if let Some(caps) = RFC_850_REGEX.captures(text) {
        DateParts {
            year: full_year(caps[3].parse().unwrap_or(0)),
            month: month_number(&caps[2]),
            day: caps[1].parse().unwrap_or(0),
            hour: caps[4].parse().unwrap_or(0),
            minute: caps[5].parse().unwrap_or(0),
            second: caps[6].parse().unwrap_or(0),
            millis: frac_to_millis(caps.get(7).map(|m| m.as_str())),
        }
    } else if let Some(caps) = ASCTIME_REGEX.captures(text) {
        DateParts {
            year: caps[7].parse().unwrap_or(0),
            month: month_number(&caps[1]),
            day: caps[2].trim_start().parse().unwrap_or(0),
            hour: caps[3].parse().unwrap_or(0),
            minute: caps[4].parse().unwrap_or(0),
            second: caps[5].parse().unwrap_or(0),
            millis: frac_to_millis(caps.get(6).map(|m| m.as_str())),
        }
    } else {
        return Err(CodecError::TimestampParse(text.to_string()));
    };

    Ok(Timestamp::from_millis(parts.validate(text)?.epoch_millis()))
}

/// Parse `epoch-seconds` text: a decimal number of seconds, optionally
/// fractional. Non-finite values are rejected; milliseconds are rounded.
pub fn parse_epoch_seconds(text: &str) -> Result<Timestamp> {
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| CodecError::TimestampParse(text.to_string()))?;
    if !value.is_finite() {
        return Err(CodecError::TimestampParse(text.to_string()));
    }
    Ok(Timestamp::from_secs_f64(value))
}

/// Format a timestamp as RFC 3339 `date-time` in UTC.
///
/// Milliseconds are emitted as a three-digit fraction when non-zero and
/// omitted entirely when zero.
#[must_use]
pub fn format_date_time(ts: Timestamp) -> String {
    let days = ts.millis().div_euclid(MILLIS_PER_DAY);
    let rem = ts.millis().rem_euclid(MILLIS_PER_DAY);
    let (year, month, day) = civil_from_days(days);
    let (hour, minute, second, millis) = split_time(rem);
    if millis == 0 {
        format!(
            "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z"
        )
    } else {
        format!(
            "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}.{millis:03}Z"
        )
    }
}

/// Format a timestamp as an IMF-fixdate `http-date`. Sub-second precision
/// is dropped, per RFC 7231.
#[must_use]
pub fn format_http_date(ts: Timestamp) -> String {
    let days = ts.millis().div_euclid(MILLIS_PER_DAY);
    let rem = ts.millis().rem_euclid(MILLIS_PER_DAY);
    let (year, month, day) = civil_from_days(days);
    let (hour, minute, second, _) = split_time(rem);
    format!(
        "{}, {:02} {} {:04} {:02}:{:02}:{:02} GMT",
        DAY_NAMES[weekday_from_days(days)],
        day,
        MONTH_NAMES[(month - 1) as usize],
        year,
        hour,
        minute,
        second
    )
}

/// Format a timestamp as `epoch-seconds`: an integer when the value is
/// whole, otherwise the shortest decimal fraction at millisecond precision.
#[must_use]
pub fn format_epoch_seconds(ts: Timestamp) -> String {
    if ts.millis() % 1_000 == 0 {
        (ts.millis() / 1_000).to_string()
    } else {
        ts.as_secs_f64().to_string()
    }
}

fn split_time(rem_millis: i64) -> (u32, u32, u32, u32) {
    let millis = (rem_millis % 1_000) as u32;
    let secs = rem_millis / 1_000;
    (
        (secs / 3_600) as u32,
        ((secs / 60) % 60) as u32,
        (secs % 60) as u32,
        millis,
    )
}
