//! Tolerant timestamp parsing and UTC label formatting.

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

/// Parse a textual timestamp into epoch seconds.
///
/// Accepts RFC 3339 / ISO-8601 with an offset (`Z` included), then naive
/// `YYYY-MM-DD[T| ]HH:MM:SS[.ffffff]`, `YYYY-MM-DDTHH:MM` and a bare
/// `YYYY-MM-DD`. Naive values are taken as UTC.
///
/// # Examples
/// ```
/// use pcapscope_core::parse_timestamp;
///
/// assert_eq!(parse_timestamp("1970-01-01T00:00:10Z"), Some(10.0));
/// assert_eq!(parse_timestamp("1970-01-01 00:00:10.5"), Some(10.5));
/// assert_eq!(parse_timestamp("not a time"), None);
/// ```
pub fn parse_timestamp(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let normalized = text.replace('Z', "+00:00");
    if let Ok(parsed) = OffsetDateTime::parse(&normalized, &Rfc3339) {
        return Some(epoch_seconds(parsed));
    }

    let naive_formats = [
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ];
    for format in naive_formats {
        if let Ok(parsed) = PrimitiveDateTime::parse(text, format) {
            return Some(epoch_seconds(parsed.assume_utc()));
        }
    }

    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| epoch_seconds(date.midnight().assume_utc()))
}

fn epoch_seconds(value: OffsetDateTime) -> f64 {
    value.unix_timestamp() as f64 + f64::from(value.nanosecond()) / 1_000_000_000.0
}

fn utc_from_epoch(seconds: f64) -> Option<OffsetDateTime> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = (((seconds - whole) * 1_000_000_000.0).round() as u32).min(999_999_999);
    OffsetDateTime::from_unix_timestamp(whole as i64)
        .ok()?
        .replace_nanosecond(nanos)
        .ok()
}

/// Resolution of a wall-clock label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClockPrecision {
    /// `HH:MM:SS.mmm`
    Millis,
    /// `HH:MM:SS`
    Seconds,
    /// `HH:MM`
    Minutes,
}

impl ClockPrecision {
    /// Precision used for a series spanning `span` seconds.
    pub(crate) fn for_span(span: f64) -> Self {
        if span < 60.0 {
            ClockPrecision::Millis
        } else if span < 3600.0 {
            ClockPrecision::Seconds
        } else {
            ClockPrecision::Minutes
        }
    }
}

/// UTC wall-clock label for an epoch instant.
pub(crate) fn clock_label(seconds: f64, precision: ClockPrecision) -> String {
    let Some(at) = utc_from_epoch(seconds) else {
        return format!("{seconds:.3}");
    };
    match precision {
        ClockPrecision::Millis => format!(
            "{:02}:{:02}:{:02}.{:03}",
            at.hour(),
            at.minute(),
            at.second(),
            at.millisecond()
        ),
        ClockPrecision::Seconds => {
            format!("{:02}:{:02}:{:02}", at.hour(), at.minute(), at.second())
        }
        ClockPrecision::Minutes => format!("{:02}:{:02}", at.hour(), at.minute()),
    }
}

pub(crate) fn ts_to_rfc3339(ts: Option<f64>) -> Option<String> {
    utc_from_epoch(ts?).and_then(|dt| dt.format(&Rfc3339).ok())
}
