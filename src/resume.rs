//! Inference of a start date from a previously written log.
//!
//! Data lines in the log carry a `MM/DD` display date right after the
//! marker token:
//!
//! ```text
//! - 07:15 【X】 12/25 21:00 post body
//!              ^^^^^
//! ```
//!
//! The last such line is taken as the most recent entry, since the log is
//! append-only. The year is not recorded, so it is guessed: the current year,
//! unless that would put the date in the future, in which case the previous
//! year. Only a single year wraparound is handled. "Today" must be the
//! display-timezone date (see [`crate::models::display_date_at`]), not the
//! host's.
//!
//! Fields may be separated by any whitespace, so tab-separated lines such
//! as `07:15\t【X】\t12/25 21:00\tbody` resume the same way.

use crate::errors::ResumeError;
use crate::models::MARKER;
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info, instrument};

static DISPLAY_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"{}\s+(\d{{2}})/(\d{{2}})(?:\s|$)", regex::escape(MARKER))).unwrap()
});

/// `MM/DD` of the last data line in `contents`, if any.
///
/// Lines without the marker, or whose field after it is not a `MM/DD`
/// date, are ignored.
pub fn last_recorded_day(contents: &str) -> Option<(u32, u32)> {
    contents
        .lines()
        .filter(|line| line.contains(MARKER))
        .filter_map(|line| {
            let caps = DISPLAY_DAY.captures(line)?;
            let month: u32 = caps[1].parse().ok()?;
            let day: u32 = caps[2].parse().ok()?;
            Some((month, day))
        })
        .last()
}

/// Attach a year to `month/day` relative to `today`.
///
/// The current year is used unless the result would be after `today`, in
/// which case the previous year is used. A day that does not exist in the
/// current year (`02/29`) also falls back to the previous year.
pub fn disambiguate_year(month: u32, day: u32, today: NaiveDate) -> Result<NaiveDate, ResumeError> {
    let year = today.year();
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(candidate) if candidate <= today => Ok(candidate),
        _ => NaiveDate::from_ymd_opt(year - 1, month, day)
            .ok_or(ResumeError::InvalidDay { month, day }),
    }
}

/// Infer the start date for a new run from the log at `path`.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn infer_start_date(path: &Path, today: NaiveDate) -> Result<NaiveDate, ResumeError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ResumeError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let (month, day) =
        last_recorded_day(&contents).ok_or_else(|| ResumeError::NoDatedEntry(path.to_path_buf()))?;
    debug!(month, day, "Last recorded display date");

    let start = disambiguate_year(month, day, today)?;
    info!(%start, "Resuming from last recorded date");
    Ok(start)
}
