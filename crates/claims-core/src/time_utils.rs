use chrono::NaiveDate;
use chrono_tz::Tz;
use serde_json::Value;
use tracing::warn;

use crate::data_processors::{ParsedDate, TimestampProcessor};
use crate::error::{ClaimsError, Result};

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Read from the OS via `iana-time-zone`.
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Resolve the `"auto"` sentinel to the system timezone.
pub fn resolve_timezone_name(name: &str) -> String {
    if name.eq_ignore_ascii_case("auto") {
        get_system_timezone()
    } else {
        name.to_string()
    }
}

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// Maps parsed dates onto calendar days of one reporting timezone.
#[derive(Debug, Clone, Copy)]
pub struct TimezoneHandler {
    tz: Tz,
}

impl Default for TimezoneHandler {
    fn default() -> Self {
        Self { tz: Tz::UTC }
    }
}

impl TimezoneHandler {
    /// Create a handler for the given IANA timezone name.
    ///
    /// If `tz_name` is not a recognised IANA timezone, falls back to UTC
    /// and logs a warning.
    pub fn new(tz_name: &str) -> Self {
        let tz = tz_name.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "TimezoneHandler: unrecognised timezone \"{}\", falling back to UTC",
                tz_name
            );
            Tz::UTC
        });
        Self { tz }
    }

    /// Validate that `tz_name` is a recognised IANA timezone identifier.
    pub fn validate_timezone(tz_name: &str) -> bool {
        tz_name.parse::<Tz>().is_ok()
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Calendar day of `date` in the reporting timezone.
    ///
    /// Date-only and wall-clock values keep the day they were written with;
    /// instants are converted into the reporting timezone first.
    pub fn calendar_date(&self, date: ParsedDate) -> NaiveDate {
        match date {
            ParsedDate::Calendar(d) => d,
            ParsedDate::Local(dt) => dt.date(),
            ParsedDate::Instant(dt) => dt.with_timezone(&self.tz).date_naive(),
        }
    }

    /// Parse a raw field value straight to its reporting-day calendar date.
    pub fn parse_date(&self, value: &Value) -> Option<NaiveDate> {
        TimestampProcessor::parse(value).map(|d| self.calendar_date(d))
    }
}

/// Parse a user-supplied date such as a filter bound.
pub fn parse_filter_date(s: &str) -> Result<NaiveDate> {
    TimestampProcessor::parse_str(s)
        .map(|d| TimezoneHandler::default().calendar_date(d))
        .ok_or_else(|| ClaimsError::InvalidDate(s.to_string()))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone as _, Utc};
    use serde_json::json;

    // ── TimezoneHandler::validate_timezone ───────────────────────────────────

    #[test]
    fn test_validate_timezone_valid() {
        assert!(TimezoneHandler::validate_timezone("America/New_York"));
        assert!(TimezoneHandler::validate_timezone("Europe/London"));
        assert!(TimezoneHandler::validate_timezone("UTC"));
    }

    #[test]
    fn test_validate_timezone_invalid() {
        assert!(!TimezoneHandler::validate_timezone("Mars/Olympus"));
        assert!(!TimezoneHandler::validate_timezone(""));
    }

    // ── TimezoneHandler::new ─────────────────────────────────────────────────

    #[test]
    fn test_new_valid_timezone() {
        let handler = TimezoneHandler::new("America/Chicago");
        assert_eq!(handler.timezone(), Tz::America__Chicago);
    }

    #[test]
    fn test_new_invalid_timezone_falls_back_to_utc() {
        let handler = TimezoneHandler::new("Invalid/Timezone");
        assert_eq!(handler.timezone(), Tz::UTC);
    }

    // ── calendar_date ────────────────────────────────────────────────────────

    #[test]
    fn test_calendar_date_keeps_date_only_values() {
        // A date-only value must not drift to the previous day west of UTC.
        let handler = TimezoneHandler::new("America/Los_Angeles");
        let date = handler.parse_date(&json!("2024-03-01")).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_calendar_date_keeps_wall_clock_values() {
        let handler = TimezoneHandler::new("Asia/Tokyo");
        let date = handler.parse_date(&json!("2024-03-01 23:59:00")).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_calendar_date_converts_instants() {
        let handler = TimezoneHandler::new("America/New_York");
        let instant = Utc.with_ymd_and_hms(2024, 3, 2, 2, 0, 0).unwrap();
        // 02:00 UTC is 21:00 the previous evening in New York.
        assert_eq!(
            handler.calendar_date(ParsedDate::Instant(instant)),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn test_parse_date_unparseable_is_none() {
        let handler = TimezoneHandler::default();
        assert!(handler.parse_date(&json!("soon")).is_none());
    }

    // ── parse_filter_date ────────────────────────────────────────────────────

    #[test]
    fn test_parse_filter_date() {
        assert_eq!(
            parse_filter_date("2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        let err = parse_filter_date("tomorrow").unwrap_err();
        assert_eq!(err.to_string(), "Invalid date: tomorrow");
    }

    // ── resolve_timezone_name ────────────────────────────────────────────────

    #[test]
    fn test_resolve_timezone_name_passthrough() {
        assert_eq!(resolve_timezone_name("Europe/Berlin"), "Europe/Berlin");
    }

    #[test]
    fn test_resolve_timezone_name_auto_is_nonempty() {
        assert!(!resolve_timezone_name("auto").is_empty());
    }
}
