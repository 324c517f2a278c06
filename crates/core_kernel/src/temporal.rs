//! Date handling for invoice headers and an injectable clock
//!
//! OCR returns invoice dates in whatever layout the supplier printed. The
//! parser tries a fixed, ordered list of layouts and the first one that
//! parses wins, so an ambiguous `03/04/2024` is read day-first.

use std::sync::RwLock;

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use thiserror::Error;

/// Date layouts accepted on invoice headers, in priority order
pub const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%d.%m.%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d-%m-%Y",
];

/// Canonical layout used when writing dates back
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Unrecognized date format: {0}")]
    UnrecognizedFormat(String),
}

/// Parses an invoice date, returning the date and the layout that matched
pub fn parse_invoice_date(raw: &str) -> Result<(NaiveDate, &'static str), TemporalError> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok().map(|d| (d, *fmt)))
        .ok_or_else(|| TemporalError::UnrecognizedFormat(raw.to_string()))
}

/// Source of the current time
///
/// Validators and the ERP client read "today" and "now" through this trait so
/// tests can pin or advance time.
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar date
    fn today(&self) -> NaiveDate;
}

/// Wall clock; `today` follows the local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Manually controlled clock for tests
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: RwLock::new(now) }
    }

    /// Clock pinned to midday UTC on the given date
    pub fn at_date(date: NaiveDate) -> Self {
        let noon = date.and_hms_opt(12, 0, 0).unwrap_or_default().and_utc();
        Self::new(noon)
    }

    /// Moves the clock forward
    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.write() {
            *now += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.read().map(|n| *n).unwrap_or_else(|e| *e.into_inner())
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_iso() {
        assert_eq!(parse_invoice_date("2024-03-15").unwrap(), (date(2024, 3, 15), "%Y-%m-%d"));
    }

    #[test]
    fn test_parse_dotted() {
        assert_eq!(parse_invoice_date("15.03.2024").unwrap().0, date(2024, 3, 15));
    }

    #[test]
    fn test_ambiguous_slash_date_is_day_first() {
        let (parsed, fmt) = parse_invoice_date("03/04/2024").unwrap();
        assert_eq!(parsed, date(2024, 4, 3));
        assert_eq!(fmt, "%d/%m/%Y");
    }

    #[test]
    fn test_month_first_fallback() {
        let (parsed, fmt) = parse_invoice_date("12/31/2024").unwrap();
        assert_eq!(parsed, date(2024, 12, 31));
        assert_eq!(fmt, "%m/%d/%Y");
    }

    #[test]
    fn test_unrecognized() {
        assert!(matches!(
            parse_invoice_date("yesterday"),
            Err(TemporalError::UnrecognizedFormat(_))
        ));
    }

    #[test]
    fn test_fixed_clock_advances() {
        let clock = FixedClock::at_date(date(2024, 1, 1));
        clock.advance(Duration::days(2));
        assert_eq!(clock.today(), date(2024, 1, 3));
    }
}
