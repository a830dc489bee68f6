use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

use crate::models::ClaimRecord;

/// Date field names probed first, in priority order.
pub const DEFAULT_DATE_FIELDS: &[&str] = &["ServiceDate", "ClaimDate", "Date", "TransactionDate"];

/// Field names matching this pattern are the fallback date fields.
pub const DEFAULT_DATE_FIELD_PATTERN: &str = r"(?i)date";

// ── DateFieldDetector ─────────────────────────────────────────────────────────

/// Resolves which field of a record carries its date.
///
/// Feeds disagree on the name (`ServiceDate`, `ClaimDate`, ...), and a single
/// dataset may mix them, so resolution happens per record:
///
/// 1. the first candidate that is present with a non-null, non-blank value;
/// 2. otherwise the first field, in source order, whose name matches the
///    fallback pattern (its value may still be unusable).
#[derive(Debug, Clone)]
pub struct DateFieldDetector {
    candidates: Vec<String>,
    fallback: Regex,
}

impl Default for DateFieldDetector {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_DATE_FIELDS.iter().map(|s| s.to_string()).collect(),
            fallback: default_pattern().clone(),
        }
    }
}

impl DateFieldDetector {
    /// Detector with a custom candidate list and the default fallback pattern.
    ///
    /// An empty list keeps the default candidates.
    pub fn with_candidates<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let candidates: Vec<String> = candidates
            .into_iter()
            .map(Into::into)
            .filter(|c| !c.trim().is_empty())
            .collect();
        if candidates.is_empty() {
            return Self::default();
        }
        Self {
            candidates,
            fallback: default_pattern().clone(),
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Name of the field holding `record`'s date, if any.
    pub fn detect<'r>(&self, record: &'r ClaimRecord) -> Option<&'r str> {
        let fields = record.fields();

        let hit = self.candidates.iter().find_map(|candidate| {
            fields
                .get_key_value(candidate.as_str())
                .filter(|(_, value)| has_usable_value(value))
                .map(|(name, _)| name.as_str())
        });
        if hit.is_some() {
            return hit;
        }

        fields
            .keys()
            .find(|name| self.fallback.is_match(name))
            .map(String::as_str)
    }

    /// Raw date value of `record`, when a date field is detected.
    pub fn date_value<'r>(&self, record: &'r ClaimRecord) -> Option<&'r Value> {
        self.detect(record).and_then(|name| record.get(name))
    }
}

/// Detect the date field of `record` with the default candidate list.
pub fn detect_date_field(record: &ClaimRecord) -> Option<&str> {
    default_detector().detect(record)
}

fn default_detector() -> &'static DateFieldDetector {
    static DETECTOR: OnceLock<DateFieldDetector> = OnceLock::new();
    DETECTOR.get_or_init(DateFieldDetector::default)
}

fn default_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(DEFAULT_DATE_FIELD_PATTERN).expect("regex is valid"))
}

fn has_usable_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

// ── TimestampProcessor ────────────────────────────────────────────────────────

/// A date value as found in the feed, before any time-zone conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDate {
    /// Date-only text; the calendar date is final.
    Calendar(NaiveDate),
    /// Wall-clock date-time without an offset; its date is final.
    Local(NaiveDateTime),
    /// A fixed instant (offset-bearing text or an epoch number).
    Instant(DateTime<Utc>),
}

/// Parses the variety of date encodings found in claim feeds.
pub struct TimestampProcessor;

impl TimestampProcessor {
    /// Parse a JSON value.
    ///
    /// * `null`, booleans, arrays, objects → `None`
    /// * string → see [`TimestampProcessor::parse_str`]
    /// * number → Unix epoch **milliseconds**
    pub fn parse(value: &Value) -> Option<ParsedDate> {
        match value {
            Value::String(s) => Self::parse_str(s),
            Value::Number(n) => {
                let millis = if let Some(ms) = n.as_i64() {
                    ms
                } else {
                    let f = n.as_f64()?;
                    if !f.is_finite() {
                        return None;
                    }
                    f.trunc() as i64
                };
                DateTime::from_timestamp_millis(millis).map(ParsedDate::Instant)
            }
            _ => None,
        }
    }

    /// Parse a date string.
    ///
    /// Accepts RFC 3339 (with `Z` or an offset), RFC 2822, ISO date-times with
    /// a `T` or a space, ISO dates, and US `MM/DD/YYYY` forms.
    pub fn parse_str(s: &str) -> Option<ParsedDate> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(ParsedDate::Instant(dt.with_timezone(&Utc)));
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Some(ParsedDate::Instant(dt.with_timezone(&Utc)));
        }

        const DATETIME_FORMATS: &[&str] = &[
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%d %H:%M",
            "%m/%d/%Y %H:%M:%S",
            "%m/%d/%Y %H:%M",
        ];
        for fmt in DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(ParsedDate::Local(naive));
            }
        }

        const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%b %d, %Y", "%B %d, %Y"];
        for fmt in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return Some(ParsedDate::Calendar(date));
            }
        }

        debug!("TimestampProcessor: could not parse date string \"{}\"", s);
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
