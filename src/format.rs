//! Feed id validation and the archived_feeds.txt CSV formatter.
//!
//! Formatting is a pure projection of the fetched datasets: malformed or
//! missing dates degrade to empty strings, they never fail the request.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ApiError;
use crate::registry::Dataset;

static FEED_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^mdb-\d+$").expect("feed id pattern must compile"));

/// Columns of the legacy archived_feeds.txt format, in emit order.
const CSV_COLUMNS: [&str; 5] = [
    "feed_start_date",
    "feed_end_date",
    "feed_version",
    "archive_url",
    "archive_note",
];

/// Checks that a feed id matches the `mdb-<number>` pattern.
pub fn validate_feed_id(feed_id: Option<&str>) -> Result<(), ApiError> {
    let feed_id = feed_id.unwrap_or("");

    if feed_id.is_empty() {
        return Err(ApiError::Validation("Feed ID is required".to_string()));
    }

    if !FEED_ID_PATTERN.is_match(feed_id) {
        return Err(ApiError::Validation(format!(
            "Invalid feed ID format: {feed_id}. Expected format: mdb-123"
        )));
    }

    Ok(())
}

/// Converts an ISO date or datetime string to `YYYYMMDD`.
///
/// Accepts `YYYY-MM-DD` and ISO-8601 datetimes (a trailing `Z` is read as
/// `+00:00`, fractional seconds are fine). Anything else, including `None`,
/// comes back as an empty string.
pub fn format_date(date_string: Option<&str>) -> String {
    let Some(raw) = date_string else {
        return String::new();
    };
    if raw.is_empty() {
        return String::new();
    }

    if raw.contains('T') {
        let normalized = match raw.strip_suffix('Z') {
            Some(stripped) => format!("{stripped}+00:00"),
            None => raw.to_string(),
        };
        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
            return dt.format("%Y%m%d").to_string();
        }
        // Naive datetimes carry no offset and are not RFC 3339.
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return dt.format("%Y%m%d").to_string();
        }
        String::new()
    } else {
        match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => date.format("%Y%m%d").to_string(),
            Err(_) => String::new(),
        }
    }
}

/// Renders datasets as archived_feeds.txt CSV text.
///
/// The header row is always present. Rows are sorted newest-first by the raw
/// `downloaded_at` string (stable for ties). With `filter_null_dates` set,
/// rows missing either service date boundary are dropped entirely.
pub fn format_archived_feeds(datasets: &[Dataset], filter_null_dates: bool) -> String {
    write_csv(datasets, filter_null_dates).unwrap_or_default()
}

fn write_csv(datasets: &[Dataset], filter_null_dates: bool) -> csv::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_COLUMNS)?;

    let mut sorted: Vec<&Dataset> = datasets.iter().collect();
    sorted.sort_by(|a, b| {
        let a_key = a.downloaded_at.as_deref().unwrap_or("");
        let b_key = b.downloaded_at.as_deref().unwrap_or("");
        b_key.cmp(a_key)
    });

    for dataset in sorted {
        let feed_start_date = format_date(dataset.service_date_range_start.as_deref());
        let feed_end_date = format_date(dataset.service_date_range_end.as_deref());

        if filter_null_dates && (feed_start_date.is_empty() || feed_end_date.is_empty()) {
            continue;
        }

        // The raw download timestamp doubles as the feed version.
        let feed_version = dataset.downloaded_at.as_deref().unwrap_or("");
        let archive_url = dataset.hosted_url.as_deref().unwrap_or("");
        let archive_note = dataset.note.as_deref().unwrap_or("");

        writer.write_record([
            feed_start_date.as_str(),
            feed_end_date.as_str(),
            feed_version,
            archive_url,
            archive_note,
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes).unwrap_or_default())
}
