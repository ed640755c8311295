//! Turns one raw post element into a [`Tweet`].
//!
//! Parsing never fails the run. A missing body becomes the empty string; a
//! missing or malformed timestamp is handled by the configured
//! [`TimestampFallback`], which may either stamp the wall clock or drop the
//! element.

use super::extractor::MarkupExtractor;
use crate::config::TimestampFallback;
use crate::driver::RawElement;
use crate::models::{StampOrigin, Tweet, display_offset};
use crate::utils::{normalize_text, truncate_for_log};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use tracing::{debug, warn};

/// Format of the `datetime` attribute; the fraction may have any width.
const RAW_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Convert a raw UTC timestamp to the display timezone (UTC+9).
///
/// ```ignore
/// let t = parse_raw_timestamp("2023-12-01T12:00:00.000000Z").unwrap();
/// assert_eq!(t.format("%m/%d %H:%M").to_string(), "12/01 21:00");
/// ```
pub fn parse_raw_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), RAW_TIMESTAMP_FORMAT).ok()?;
    Some(naive.and_utc().with_timezone(&display_offset()))
}

/// Element parser bound to an extractor and a fallback policy.
#[derive(Debug)]
pub struct ElementParser<'a, X> {
    extractor: &'a X,
    fallback: TimestampFallback,
}

impl<'a, X: MarkupExtractor> ElementParser<'a, X> {
    pub fn new(extractor: &'a X, fallback: TimestampFallback) -> Self {
        Self {
            extractor,
            fallback,
        }
    }

    /// Parse one element, or `None` when it has to be skipped.
    pub fn parse(&self, element: &RawElement) -> Option<Tweet> {
        let fields = self.extractor.extract(element);
        let text = normalize_text(&fields.text.unwrap_or_default());
        let raw = fields.timestamp;

        let (posted_at, stamp) = match raw.as_deref().and_then(parse_raw_timestamp) {
            Some(ts) => (ts, StampOrigin::Extracted),
            None => match self.fallback {
                TimestampFallback::WallClock => {
                    debug!(?raw, text = %truncate_for_log(&text, 60), "No usable timestamp; stamping wall clock");
                    (Utc::now().with_timezone(&display_offset()), StampOrigin::Fallback)
                }
                TimestampFallback::Discard => {
                    warn!(?raw, text = %truncate_for_log(&text, 60), "No usable timestamp; skipping element");
                    return None;
                }
            },
        };

        Some(Tweet {
            posted_at,
            stamp,
            text,
            author: fields.author,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::fake::PipeExtractor;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_raw_timestamp_shifts_nine_hours() {
        let t = parse_raw_timestamp("2023-12-01T12:00:00.000000Z").unwrap();
        assert_eq!(t.format("%m/%d %H:%M").to_string(), "12/01 21:00");
    }

    #[test]
    fn test_raw_timestamp_crosses_midnight() {
        let t = parse_raw_timestamp("2023-12-31T20:30:00.000Z").unwrap();
        assert_eq!(t.format("%Y/%m/%d %H:%M").to_string(), "2024/01/01 05:30");
        assert_eq!(t, display_offset().with_ymd_and_hms(2024, 1, 1, 5, 30, 0).unwrap());
    }

    #[test]
    fn test_raw_timestamp_rejects_other_formats() {
        assert!(parse_raw_timestamp("2023-12-01 12:00:00").is_none());
        assert!(parse_raw_timestamp("2023-12-01T12:00:00+09:00").is_none());
        assert!(parse_raw_timestamp("").is_none());
    }

    #[test]
    fn test_parse_normalizes_text() {
        let parser = ElementParser::new(&PipeExtractor, TimestampFallback::WallClock);
        let tweet = parser
            .parse(&RawElement::new(" hello\nthere |2023-12-01T12:00:00.000Z"))
            .unwrap();
        assert_eq!(tweet.text, "hello there");
        assert_eq!(tweet.stamp, StampOrigin::Extracted);
        assert_eq!(tweet.author, None);
    }

    #[test]
    fn test_missing_text_is_empty_string() {
        let parser = ElementParser::new(&PipeExtractor, TimestampFallback::WallClock);
        let tweet = parser.parse(&RawElement::new("-|2023-12-01T12:00:00.000Z")).unwrap();
        assert_eq!(tweet.text, "");
    }

    #[test]
    fn test_wall_clock_fallback() {
        let parser = ElementParser::new(&PipeExtractor, TimestampFallback::WallClock);
        let before = Utc::now();
        let tweet = parser.parse(&RawElement::new("no time|-")).unwrap();
        assert_eq!(tweet.stamp, StampOrigin::Fallback);
        assert_eq!(tweet.posted_at.offset(), &display_offset());
        let stamped = tweet.posted_at.with_timezone(&Utc);
        assert!(stamped >= before - Duration::seconds(1));
        assert!(stamped <= Utc::now() + Duration::seconds(1));
    }

    #[test]
    fn test_malformed_timestamp_uses_fallback() {
        let parser = ElementParser::new(&PipeExtractor, TimestampFallback::WallClock);
        let tweet = parser.parse(&RawElement::new("odd|yesterday")).unwrap();
        assert_eq!(tweet.stamp, StampOrigin::Fallback);
    }

    #[test]
    fn test_discard_fallback_skips_element() {
        let parser = ElementParser::new(&PipeExtractor, TimestampFallback::Discard);
        assert!(parser.parse(&RawElement::new("no time|-")).is_none());
        assert!(parser
            .parse(&RawElement::new("timed|2023-12-01T12:00:00.000Z"))
            .is_some());
    }
}
