//! One download run, from start-date resolution to the written log.
//!
//! [`plan`] settles everything that can be known before a browser is
//! opened: the search window and how the log will be opened. [`execute`]
//! then collects with whatever driver it is handed and applies the run-level
//! rules:
//!
//! - an unattended login wall ends the run without touching the log
//! - an aborted collection still writes what it gathered, then fails
//! - records are sorted by post time before they are written

use crate::config::Settings;
use crate::driver::PageDriver;
use crate::errors::RunError;
use crate::models::{SearchQuery, StampOrigin, Tweet, sort_chronologically};
use crate::outputs::markdown::{WriteMode, choose_write_mode, write_markdown};
use crate::resume;
use crate::scrapers::collector::{Checkpoint, OperatorSignal, StopReason};
use crate::scrapers::extractor::MarkupExtractor;
use crate::scrapers::run_session;
use chrono::NaiveDate;
use std::error::Error;
use std::path::PathBuf;
use tracing::{error, info, instrument, warn};

/// What the user asked for.
#[derive(Debug, Clone)]
pub struct Job {
    pub username: String,
    pub output: PathBuf,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// A job with its start date resolved.
#[derive(Debug, Clone)]
pub struct Plan {
    pub query: SearchQuery,
    pub output: PathBuf,
    pub mode: WriteMode,
}

/// Counts reported after a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub written: usize,
    /// Records stamped with the wall clock instead of their own time.
    pub fallback_stamps: usize,
    /// Records whose permalink names an account other than the queried one.
    pub other_authors: usize,
}

impl Outcome {
    fn tally(tweets: &[Tweet], username: &str) -> Self {
        Self {
            written: tweets.len(),
            fallback_stamps: tweets
                .iter()
                .filter(|t| t.stamp == StampOrigin::Fallback)
                .count(),
            other_authors: tweets
                .iter()
                .filter_map(|t| t.author.as_deref())
                .filter(|a| !a.eq_ignore_ascii_case(username))
                .count(),
        }
    }
}

/// Resolve the start date and write mode for `job`.
///
/// `today` is the display-timezone date used to place an inferred `MM/DD`
/// in a year.
#[instrument(level = "info", skip_all, fields(output = %job.output.display()))]
pub async fn plan(job: &Job, today: NaiveDate) -> Result<Plan, Box<dyn Error>> {
    let output_exists = tokio::fs::try_exists(&job.output).await.unwrap_or(false);

    let start_date = match job.start_date {
        Some(date) => Some(date),
        None if output_exists => {
            info!("No start date provided; checking the log for the last tweet date");
            match resume::infer_start_date(&job.output, today).await {
                Ok(date) => Some(date),
                Err(e) => {
                    warn!(error = %e, "Could not infer start date");
                    None
                }
            }
        }
        None => None,
    };
    let mode = choose_write_mode(output_exists, start_date.is_some());

    let Some(since) = start_date else {
        error!("Start date is required and could not be inferred from the output file");
        return Err(RunError::NoStartDate(job.output.clone()).into());
    };

    Ok(Plan {
        query: SearchQuery {
            username: job.username.clone(),
            since,
            until: job.end_date,
        },
        output: job.output.clone(),
        mode,
    })
}

/// Collect with `driver`, then sort and write the result per `plan`.
///
/// The driver is closed before anything is written.
#[instrument(level = "info", skip_all, fields(query = %plan.query, mode = ?plan.mode))]
pub async fn execute<D, X, S>(
    driver: D,
    extractor: &X,
    checkpoint: Checkpoint<S>,
    settings: &Settings,
    plan: &Plan,
    execution_time: &str,
) -> Result<Outcome, Box<dyn Error>>
where
    D: PageDriver,
    X: MarkupExtractor,
    S: OperatorSignal,
{
    let collection = run_session(driver, extractor, &plan.query, settings, checkpoint).await;

    let mut tweets = collection.tweets;
    sort_chronologically(&mut tweets);
    info!(count = tweets.len(), "Total tweets found");

    let aborted = match collection.stop {
        StopReason::LoginWall => {
            error!("Headless mode detected, cannot wait for manual login");
            return Err(RunError::LoginWall.into());
        }
        StopReason::Aborted(e) => Some(e),
        StopReason::FeedEmpty | StopReason::ScrollExhausted => None,
    };

    if let Err(e) = write_markdown(&plan.output, &tweets, execution_time, plan.mode).await {
        error!(path = %plan.output.display(), error = %e, "Failed writing tweet log");
        return Err(e);
    }

    if let Some(e) = aborted {
        error!(count = tweets.len(), path = %plan.output.display(), error = %e, "Run aborted; partial results saved");
        return Err(e.into());
    }

    let outcome = Outcome::tally(&tweets, &plan.query.username);
    if outcome.fallback_stamps > 0 {
        warn!(count = outcome.fallback_stamps, "Some tweets had no timestamp and were stamped with the current time");
    }
    if outcome.other_authors > 0 {
        info!(count = outcome.other_authors, "Some tweets link to other accounts");
    }
    Ok(outcome)
}
