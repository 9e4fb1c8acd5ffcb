//! Date parsing against a template's ordered format list

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Try each format in order: offset-aware first, then naive date-time, then
/// bare date. Offset-aware values keep the calendar date of their own offset.
pub fn parse_date(raw: &str, formats: &[String]) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for format in formats {
        if let Ok(parsed) = DateTime::parse_from_str(raw, format) {
            return Some(parsed.date_naive());
        }
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.date());
        }
        if let Ok(parsed) = NaiveDate::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }

    None
}
