//! Utility functions for text normalization, time labels, and log previews.
//!
//! This module provides helpers used throughout the application:
//! - Whitespace normalization for post bodies (also the dedup key)
//! - The `HH:MM` execution-time label stamped on every line of a run
//! - `YYYY-MM-DD` argument parsing for the CLI
//! - String truncation for logging

use chrono::{NaiveDate, NaiveDateTime};

/// Collapse line breaks to single spaces and trim the ends.
///
/// Inner runs of ordinary spaces are left untouched so the stored text stays
/// as close to the original post as possible.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_text("  a\nb\r\nc "), "a b c");
/// ```
pub fn normalize_text(raw: &str) -> String {
    raw.replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}

/// Format the wall-clock start of a run as `HH:MM`.
pub fn execution_time_label(started: NaiveDateTime) -> String {
    started.format("%H:%M").to_string()
}

/// Parse a `YYYY-MM-DD` date argument.
///
/// Used as a `clap` value parser, hence the `String` error.
pub fn parse_ymd(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| format!("expected a date like 2024-01-31: {e}"))
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at `max` characters with an ellipsis and a count of
/// the dropped characters appended. Cuts on character boundaries, post
/// bodies are rarely ASCII.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 chars)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{}…(+{} chars)", head, total - max)
    }
}
