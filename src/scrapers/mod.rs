//! Collection of posts from the X live-search feed.
//!
//! A run goes through three layers:
//!
//! 1. **Extraction** ([`extractor`]): pull raw text/timestamp/author out of one
//!    post element's markup
//! 2. **Parsing** ([`parser`]): normalize text and convert the timestamp to
//!    UTC+9, producing a [`Tweet`](crate::models::Tweet)
//! 3. **Collection** ([`collector`]): scroll the feed, scan, dedupe by text,
//!    and stop when the page stops growing
//!
//! [`run_session`] wraps a collection with the lifetime of one browser
//! session, so the driver is closed on every exit path.

pub mod collector;
pub mod extractor;
pub mod parser;

#[cfg(test)]
pub(crate) mod fake;

use crate::config::Settings;
use crate::driver::PageDriver;
use crate::models::SearchQuery;
use collector::{Checkpoint, Collection, OperatorSignal};
use extractor::MarkupExtractor;
use std::io;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{instrument, warn};

/// Run one collection and release the driver afterwards.
///
/// A failure to close the session is logged, never surfaced: the collected
/// tweets are still good.
#[instrument(level = "info", skip_all)]
pub async fn run_session<D, X, S>(
    mut driver: D,
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
    let collection = collector::collect(&mut driver, extractor, query, settings, checkpoint).await;
    if let Err(e) = driver.close().await {
        warn!(error = %e, "Failed to close browser session");
    }
    collection
}

/// Operator signal that asks on stdout and waits for Enter on stdin.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl OperatorSignal for StdinPrompt {
    async fn wait_for_operator(&mut self) -> io::Result<()> {
        let rule = "=".repeat(50);
        println!("\n{rule}");
        println!("Could not find tweets immediately. You might be hit by a login wall.");
        println!("Please log in to X (Twitter) in the opened browser window.");
        println!("Once logged in and you see the search results, press Enter in this terminal to continue...");
        println!("{rule}\n");

        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stdin closed before the operator confirmed",
            ));
        }
        Ok(())
    }
}
