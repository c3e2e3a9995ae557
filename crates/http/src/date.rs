//! HTTP date collaborator.
//!
//! The `Date` response header is produced through a [`DateSource`] so tests can
//! pin the clock with [`FixedDate`]; servers use [`SystemDate`].

use std::fmt;
use std::time::SystemTime;

use httpdate::{fmt_http_date, parse_http_date as parse_imf_fixdate};
use thiserror::Error;

/// Supplies the value of the `Date` response header.
pub trait DateSource: fmt::Debug + Send + Sync {
    /// The current time in IMF-fixdate form, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
    fn current_http_date(&self) -> String;
}

/// Reads the system clock on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDate;

impl DateSource for SystemDate {
    fn current_http_date(&self) -> String {
        fmt_http_date(SystemTime::now())
    }
}

/// Always returns the same date.
#[derive(Debug, Clone)]
pub struct FixedDate(String);

impl FixedDate {
    pub fn new(date: impl Into<String>) -> Self {
        Self(date.into())
    }

    pub fn at(time: SystemTime) -> Self {
        Self(fmt_http_date(time))
    }
}

impl DateSource for FixedDate {
    fn current_http_date(&self) -> String {
        self.0.clone()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid http date: {value}")]
pub struct DateError {
    value: String,
}

pub fn format_http_date(time: SystemTime) -> String {
    fmt_http_date(time)
}

/// Parses any of the three date formats HTTP/1.1 accepts.
///
/// # Errors
///
/// Returns [`DateError`] when `value` is none of IMF-fixdate, RFC 850 or
/// asctime.
pub fn parse_http_date(value: &str) -> Result<SystemTime, DateError> {
    parse_imf_fixdate(value).map_err(|_| DateError { value: value.to_string() })
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use super::*;

    #[test]
    fn format_and_parse() {
        let time = UNIX_EPOCH + Duration::from_secs(784_111_777);
        let text = format_http_date(time);

        assert_eq!(text, "Sun, 06 Nov 1994 08:49:37 GMT");
        assert_eq!(parse_http_date(&text), Ok(time));
        assert_eq!(parse_http_date(&format_http_date(time + Duration::from_secs(81))), Ok(time + Duration::from_secs(81)));
    }

    #[test]
    fn parse_legacy_formats() {
        let time = UNIX_EPOCH + Duration::from_secs(784_111_777);
        assert_eq!(parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT"), Ok(time));
        assert_eq!(parse_http_date("Sun Nov  6 08:49:37 1994"), Ok(time));
    }

    #[test]
    fn parse_garbage() {
        assert!(parse_http_date("yesterday").is_err());
        assert!(parse_http_date("").is_err());
    }

    #[test]
    fn fixed_date() {
        let date = FixedDate::at(UNIX_EPOCH);
        assert_eq!(date.current_http_date(), "Thu, 01 Jan 1970 00:00:00 GMT");
        assert_eq!(FixedDate::new("x").current_http_date(), "x");
    }

    #[test]
    fn system_date_is_parseable() {
        let now = SystemDate.current_http_date();
        assert!(parse_http_date(&now).is_ok());
    }
}
