//! Data models for collected posts and their log representation.
//!
//! This module defines the record produced by the scraper and the fixed
//! line format used by the Markdown log:
//! - [`Tweet`]: one normalized post, stamped in UTC+9
//! - [`StampOrigin`]: whether the timestamp came from the page or a fallback
//! - [`SearchQuery`]: the `from:/since:/until:` query a run executes
//!
//! Every line written to the log looks like
//!
//! ```text
//! - 07:15 【X】 12/01 21:00 post body on a single line
//! ```
//!
//! where the first `HH:MM` is the time the run started and the second part
//! is the post's own date and time.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::fmt;

/// Literal token that marks a data line in the output log.
pub const MARKER: &str = "【X】";

/// Offset of the display timezone (UTC+9), in seconds.
pub const DISPLAY_OFFSET_SECS: i32 = 9 * 60 * 60;

/// Display timezone used for every stored timestamp.
pub fn display_offset() -> FixedOffset {
    FixedOffset::east_opt(DISPLAY_OFFSET_SECS).expect("UTC+9 is a valid offset")
}

/// Calendar date in the display timezone at `now`.
///
/// Recorded `MM/DD` values are display dates, so anything compared against
/// them has to be one too, whatever the host's own timezone is.
pub fn display_date_at(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&display_offset()).date_naive()
}

/// Where a record's timestamp came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampOrigin {
    /// Parsed from the post's own `datetime` attribute.
    Extracted,
    /// The post carried no usable timestamp; stamped with the wall clock.
    Fallback,
}

/// A single collected post.
///
/// Built once by the element parser and never mutated afterwards. The
/// `text` field is already whitespace-normalized and doubles as the
/// in-run deduplication key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tweet {
    /// Post time in the display timezone (UTC+9).
    pub posted_at: DateTime<FixedOffset>,
    /// Whether `posted_at` is the real post time or a fallback stamp.
    pub stamp: StampOrigin,
    /// Post body on a single line.
    pub text: String,
    /// Author handle, when the markup exposed one.
    pub author: Option<String>,
}

impl Tweet {
    /// Render the record as one log line.
    ///
    /// `execution_time` is the `HH:MM` label of the run that collected it.
    pub fn to_markdown(&self, execution_time: &str) -> String {
        format!(
            "- {} {} {} {}",
            execution_time,
            MARKER,
            self.display_date(),
            crate::utils::normalize_text(&self.text)
        )
    }

    /// `MM/DD HH:MM` in the display timezone.
    pub fn display_date(&self) -> String {
        self.posted_at.format("%m/%d %H:%M").to_string()
    }
}

/// Sort records ascending by timestamp; ties keep encounter order.
pub fn sort_chronologically(tweets: &mut [Tweet]) {
    tweets.sort_by_key(|t| t.posted_at);
}

/// An advanced-search query for one user's posts in a date window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub username: String,
    pub since: NaiveDate,
    pub until: Option<NaiveDate>,
}

impl SearchQuery {
    /// Build the live-results search URL for this query.
    ///
    /// `search_base` is the search page without a query string, e.g.
    /// `https://x.com/search`.
    pub fn url(&self, search_base: &str) -> String {
        format!(
            "{}?q={}&src=typed_query&f=live",
            search_base,
            urlencoding::encode(&self.to_string())
        )
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "from:{} since:{}",
            self.username,
            self.since.format("%Y-%m-%d")
        )?;
        if let Some(until) = self.until {
            write!(f, " until:{}", until.format("%Y-%m-%d"))?;
        }
        Ok(())
    }
}
