//! HTTP date handling.
//!
//! HTTP/1.0 allows three date grammars in request headers. They are tried in
//! a fixed order and the one that matched is kept alongside the parsed value.
//! All values are UTC; nothing here depends on the local time zone.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::time::SystemTime;

/// The date grammars accepted in `If-Modified-Since`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `Sun, 06 Nov 1994 08:49:37 GMT`
    Rfc1123,
    /// `Sunday, 06-Nov-94 08:49:37 GMT`
    Rfc850,
    /// `Sun Nov  6 08:49:37 1994`
    Asctime,
}

impl DateFormat {
    /// Parse priority.
    pub const ALL: [DateFormat; 3] = [DateFormat::Rfc1123, DateFormat::Rfc850, DateFormat::Asctime];

    pub fn pattern(&self) -> &'static str {
        match self {
            DateFormat::Rfc1123 => "%a, %d %b %Y %H:%M:%S GMT",
            DateFormat::Rfc850 => "%A, %d-%b-%y %H:%M:%S GMT",
            DateFormat::Asctime => "%a %b %e %H:%M:%S %Y",
        }
    }

    /// Parses `value` with this grammar only.
    pub fn parse(&self, value: &str) -> Option<DateTime<Utc>> {
        let parsed = match self {
            // asctime pads single-digit days with a space
            DateFormat::Asctime => {
                let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
                NaiveDateTime::parse_from_str(&collapsed, self.pattern())
            }
            _ => NaiveDateTime::parse_from_str(value, self.pattern()),
        };

        parsed.ok().map(|naive| naive.and_utc())
    }
}

/// Tries every grammar in priority order; the first match wins.
///
/// # Example
///
/// ```
/// # use sws::http::date::{parse_http_date, DateFormat};
/// let (_, format) = parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT").unwrap();
/// assert_eq!(format, DateFormat::Rfc850);
/// assert!(parse_http_date("yesterday").is_none());
/// ```
pub fn parse_http_date(value: &str) -> Option<(DateTime<Utc>, DateFormat)> {
    let value = value.trim();
    DateFormat::ALL
        .iter()
        .find_map(|format| format.parse(value).map(|time| (time, *format)))
}

/// Formats a timestamp as an RFC 1123 date, the only grammar the server emits.
pub fn format_http_date(time: DateTime<Utc>) -> String {
    time.format(DateFormat::Rfc1123.pattern()).to_string()
}

/// Converts a filesystem timestamp to whole seconds in UTC.
pub fn from_system_time(time: SystemTime) -> DateTime<Utc> {
    let time: DateTime<Utc> = time.into();
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap()
    }

    #[test]
    fn parses_all_three_grammars() {
        assert_eq!(
            parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT"),
            Some((reference(), DateFormat::Rfc1123))
        );
        assert_eq!(
            parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT"),
            Some((reference(), DateFormat::Rfc850))
        );
        assert_eq!(
            parse_http_date("Sun Nov  6 08:49:37 1994"),
            Some((reference(), DateFormat::Asctime))
        );
    }

    #[test]
    fn format_round_trips_through_rfc1123() {
        let text = format_http_date(reference());
        assert_eq!(text, "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_http_date("").is_none());
        assert!(parse_http_date("Sun, 06 Nov 1994").is_none());
        assert!(parse_http_date("06 Nov 1994 08:49:37").is_none());
    }

    #[test]
    fn system_time_is_truncated_to_seconds() {
        let time = SystemTime::UNIX_EPOCH + std::time::Duration::from_millis(1_500);
        assert_eq!(from_system_time(time).timestamp(), 1);
        assert_eq!(from_system_time(time).timestamp_subsec_nanos(), 0);
    }
}
