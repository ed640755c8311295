//! The scroll / scan / dedupe loop over a live search feed.
//!
//! The feed is an infinite scroll with no page count, so the loop is a small
//! state machine:
//!
//! ```text
//! Init ─▶ AwaitInitialLoad ─┬─▶ ScanPage ◀──────────┐
//!                           │       │               │ extent grew
//!                           └─▶ LoginWallCheck      ▼
//!                                   │            Scroll ─▶ Done (extent unchanged)
//!                                   └─▶ ScanPage
//! ```
//!
//! An empty scan is retried once after a grace period before it ends the run,
//! so a slow render does not terminate collection early. Any driver error
//! aborts the run but keeps what was already collected.

use super::extractor::MarkupExtractor;
use super::parser::ElementParser;
use crate::config::Settings;
use crate::driver::PageDriver;
use crate::errors::CollectError;
use crate::models::{SearchQuery, Tweet};
use std::collections::HashSet;
use std::io;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Resumption signal for the attended login-wall checkpoint.
pub trait OperatorSignal {
    /// Block until the operator reports the page is usable again.
    async fn wait_for_operator(&mut self) -> io::Result<()>;
}

/// How the login-wall checkpoint behaves; chosen once per run.
#[derive(Debug)]
pub enum Checkpoint<S> {
    /// No human available: a login wall ends the run with nothing.
    Unattended,
    /// Suspend on `S` until the operator has logged in.
    Attended(S),
}

/// Why the loop stopped.
#[derive(Debug)]
pub enum StopReason {
    /// A scan found no posts, twice in a row.
    FeedEmpty,
    /// Scrolling no longer grew the page.
    ScrollExhausted,
    /// No posts appeared and nobody could log in.
    LoginWall,
    /// A driver or checkpoint failure; the tweets collected so far are kept.
    Aborted(CollectError),
}

/// Result of one collection run, in encounter order (not yet sorted).
#[derive(Debug)]
pub struct Collection {
    pub tweets: Vec<Tweet>,
    pub stop: StopReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    AwaitInitialLoad,
    LoginWallCheck,
    ScanPage,
    Scroll,
}

enum Step {
    Next(State),
    Done(StopReason),
}

/// Owns the per-run dedup set and result list for the loop's lifetime.
struct Run<'a, D, X, S> {
    driver: &'a mut D,
    parser: ElementParser<'a, X>,
    settings: &'a Settings,
    checkpoint: Checkpoint<S>,
    url: String,
    seen: HashSet<String>,
    tweets: Vec<Tweet>,
}

/// Drive `driver` through the search feed for `query`.
///
/// The driver is borrowed, not closed; see [`super::run_session`] for the
/// wrapper that also releases it.
#[instrument(level = "info", skip_all, fields(query = %query))]
pub async fn collect<D, X, S>(
    driver: &mut D,
    extractor: &X,
    query: &SearchQuery,
    settings: &Settings,
    checkpoint: Checkpoint<S>,
) -> Collection
where
    D: PageDriver,
    X: MarkupExtractor,
    S: OperatorSignal,
{
    let mut run = Run {
        driver,
        parser: ElementParser::new(extractor, settings.timestamp_fallback),
        settings,
        checkpoint,
        url: query.url(&settings.search_base_url),
        seen: HashSet::new(),
        tweets: Vec::new(),
    };

    let mut state = State::Init;
    loop {
        match run.step(state).await {
            Ok(Step::Next(next)) => {
                debug!(from = ?state, to = ?next, "State transition");
                state = next;
            }
            Ok(Step::Done(stop)) => {
                info!(count = run.tweets.len(), ?stop, "Collection finished");
                return Collection {
                    tweets: run.tweets,
                    stop,
                };
            }
            Err(e) => {
                error!(?state, error = %e, collected = run.tweets.len(), "Collection aborted");
                return Collection {
                    tweets: run.tweets,
                    stop: StopReason::Aborted(e),
                };
            }
        }
    }
}

impl<D, X, S> Run<'_, D, X, S>
where
    D: PageDriver,
    X: MarkupExtractor,
    S: OperatorSignal,
{
    async fn step(&mut self, state: State) -> Result<Step, CollectError> {
        match state {
            State::Init => {
                info!(url = %self.url, "Navigating");
                self.driver.navigate(&self.url).await?;
                Ok(Step::Next(State::AwaitInitialLoad))
            }
            State::AwaitInitialLoad => {
                sleep(self.settings.initial_settle()).await;
                let found = self
                    .driver
                    .wait_for_any_element(&self.settings.post_selector, self.settings.load_timeout())
                    .await?;
                Ok(Step::Next(if found {
                    State::ScanPage
                } else {
                    State::LoginWallCheck
                }))
            }
            State::LoginWallCheck => self.login_wall().await,
            State::ScanPage => self.scan_page().await,
            State::Scroll => self.scroll().await,
        }
    }

    async fn login_wall(&mut self) -> Result<Step, CollectError> {
        warn!("Could not find posts immediately; the search may be behind a login wall");
        match &mut self.checkpoint {
            Checkpoint::Unattended => {
                error!("Headless mode cannot wait for a manual login; giving up");
                Ok(Step::Done(StopReason::LoginWall))
            }
            Checkpoint::Attended(signal) => {
                signal
                    .wait_for_operator()
                    .await
                    .map_err(CollectError::Operator)?;
                info!("Operator confirmed; resuming scan");
                Ok(Step::Next(State::ScanPage))
            }
        }
    }

    async fn scan_page(&mut self) -> Result<Step, CollectError> {
        let settings = self.settings;
        let selector = &settings.post_selector;
        let mut elements = self.driver.list_elements(selector).await?;
        if elements.is_empty() {
            debug!(grace = ?settings.empty_retry(), "No posts on page; retrying once");
            sleep(settings.empty_retry()).await;
            elements = self.driver.list_elements(selector).await?;
            if elements.is_empty() {
                info!("No posts found. Stopping.");
                return Ok(Step::Done(StopReason::FeedEmpty));
            }
        }

        let mut added = 0usize;
        for element in &elements {
            let Some(tweet) = self.parser.parse(element) else {
                continue;
            };
            if self.seen.insert(tweet.text.clone()) {
                self.tweets.push(tweet);
                added += 1;
            }
        }
        debug!(listed = elements.len(), added, "Scanned page");
        Ok(Step::Next(State::Scroll))
    }

    async fn scroll(&mut self) -> Result<Step, CollectError> {
        let before = self.driver.current_scroll_extent().await?;
        self.driver.scroll_to_bottom().await?;
        sleep(self.settings.scroll_settle()).await;
        let after = self.driver.current_scroll_extent().await?;

        if after == before {
            debug!(extent = after, "Scroll extent unchanged");
            return Ok(Step::Done(StopReason::ScrollExhausted));
        }
        info!(count = self.tweets.len(), extent = after, "Collected {} tweets so far...", self.tweets.len());
        Ok(Step::Next(State::ScanPage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::fake::{CountingSignal, FakeDriver, PipeExtractor, instant_settings};
    use chrono::NaiveDate;

    const A: &str = "a|2023-12-01T12:00:00.000Z";
    const B: &str = "b|2023-12-01T13:00:00.000Z";
    const C: &str = "c|2023-12-01T14:00:00.000Z";

    fn query() -> SearchQuery {
        SearchQuery {
            username: "jack".to_string(),
            since: NaiveDate::from_ymd_opt(2023, 12, 1).unwrap(),
            until: None,
        }
    }

    async fn run_unattended(driver: &mut FakeDriver) -> Collection {
        let settings = instant_settings();
        collect(
            driver,
            &PipeExtractor,
            &query(),
            &settings,
            Checkpoint::<&mut CountingSignal>::Unattended,
        )
        .await
    }

    #[tokio::test]
    async fn test_dedupes_by_text_across_scrolls() {
        let mut driver = FakeDriver::new(
            vec![vec![A, B], vec![B, C, A]],
            vec![100, 200, 200, 200],
        );
        let collection = run_unattended(&mut driver).await;

        let texts: Vec<&str> = collection.tweets.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
        assert!(matches!(collection.stop, StopReason::ScrollExhausted));
        assert_eq!(driver.list_calls, 2);
        assert_eq!(driver.scroll_calls, 2);
    }

    #[tokio::test]
    async fn test_normalized_text_is_the_dedup_key() {
        let same = "same post|2023-12-01T12:00:00.000Z";
        let wrapped = "same\npost |2023-12-01T12:05:00.000Z";
        let mut driver = FakeDriver::new(vec![vec![same, wrapped]], vec![10, 10]);
        let collection = run_unattended(&mut driver).await;
        assert_eq!(collection.tweets.len(), 1);
    }

    #[tokio::test]
    async fn test_unchanged_extent_stops_without_rescanning() {
        let mut driver = FakeDriver::new(vec![vec![A], vec![B]], vec![500, 500]);
        let collection = run_unattended(&mut driver).await;

        assert!(matches!(collection.stop, StopReason::ScrollExhausted));
        assert_eq!(driver.list_calls, 1);
        assert_eq!(driver.scroll_calls, 1);
        assert_eq!(collection.tweets.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_scan_retried_once_then_done() {
        let mut driver = FakeDriver::new(vec![], vec![]);
        let collection = run_unattended(&mut driver).await;

        assert!(collection.tweets.is_empty());
        assert!(matches!(collection.stop, StopReason::FeedEmpty));
        assert_eq!(driver.list_calls, 2);
        assert_eq!(driver.scroll_calls, 0);
    }

    #[tokio::test]
    async fn test_empty_scan_recovers_on_retry() {
        let mut driver = FakeDriver::new(vec![vec![], vec![A]], vec![10, 10]);
        let collection = run_unattended(&mut driver).await;

        assert_eq!(collection.tweets.len(), 1);
        assert!(matches!(collection.stop, StopReason::ScrollExhausted));
    }

    #[tokio::test]
    async fn test_unparseable_elements_are_skipped() {
        let mut driver = FakeDriver::new(vec![vec!["no separator", A]], vec![1, 1]);
        let mut settings = instant_settings();
        settings.timestamp_fallback = crate::config::TimestampFallback::Discard;
        let collection = collect(
            &mut driver,
            &PipeExtractor,
            &query(),
            &settings,
            Checkpoint::<&mut CountingSignal>::Unattended,
        )
        .await;

        let texts: Vec<&str> = collection.tweets.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["a"]);
    }

    #[tokio::test]
    async fn test_login_wall_unattended_returns_nothing() {
        let mut driver = FakeDriver::new(vec![vec![A]], vec![1, 1]);
        driver.posts_present = false;
        let collection = run_unattended(&mut driver).await;

        assert!(collection.tweets.is_empty());
        assert!(matches!(collection.stop, StopReason::LoginWall));
        assert_eq!(driver.list_calls, 0);
    }

    #[tokio::test]
    async fn test_login_wall_attended_waits_for_operator() {
        let mut driver = FakeDriver::new(vec![vec![A]], vec![1, 1]);
        driver.posts_present = false;
        let mut signal = CountingSignal::default();
        let settings = instant_settings();

        let collection = collect(
            &mut driver,
            &PipeExtractor,
            &query(),
            &settings,
            Checkpoint::Attended(&mut signal),
        )
        .await;

        assert_eq!(signal.calls, 1);
        assert_eq!(collection.tweets.len(), 1);
        assert!(matches!(collection.stop, StopReason::ScrollExhausted));
    }

    #[tokio::test]
    async fn test_operator_failure_aborts() {
        let mut driver = FakeDriver::new(vec![], vec![]);
        driver.posts_present = false;
        let mut signal = CountingSignal {
            fail: true,
            ..CountingSignal::default()
        };
        let settings = instant_settings();

        let collection = collect(
            &mut driver,
            &PipeExtractor,
            &query(),
            &settings,
            Checkpoint::Attended(&mut signal),
        )
        .await;

        assert!(matches!(
            collection.stop,
            StopReason::Aborted(CollectError::Operator(_))
        ));
    }

    #[tokio::test]
    async fn test_driver_failure_keeps_partial_results() {
        // Only one extent scripted: the second read fails.
        let mut driver = FakeDriver::new(vec![vec![A, B]], vec![100]);
        let collection = run_unattended(&mut driver).await;

        assert_eq!(collection.tweets.len(), 2);
        assert!(matches!(
            collection.stop,
            StopReason::Aborted(CollectError::Driver(_))
        ));
    }

    #[tokio::test]
    async fn test_navigation_failure_aborts_immediately() {
        let mut driver = FakeDriver::new(vec![], vec![]);
        driver.fail_navigation = true;
        let collection = run_unattended(&mut driver).await;

        assert!(collection.tweets.is_empty());
        assert!(matches!(collection.stop, StopReason::Aborted(_)));
        assert_eq!(driver.list_calls, 0);
    }

    #[tokio::test]
    async fn test_navigates_to_live_search_url() {
        let mut driver = FakeDriver::new(vec![], vec![]);
        run_unattended(&mut driver).await;
        assert_eq!(
            driver.navigated_to,
            vec!["https://x.com/search?q=from%3Ajack%20since%3A2023-12-01&src=typed_query&f=live".to_string()]
        );
    }
}
