//! # Tweet Downloader
//!
//! Collects one account's posts from the X live-search feed within a date
//! window and appends them to a Markdown log, picking up where the previous
//! run left off.
//!
//! ## Usage
//!
//! ```sh
//! chromedriver --port=9515 &
//! tweet_downloader jack 2024-01-01
//! tweet_downloader jack          # resumes from the last date in tweets.md
//! ```
//!
//! ## Architecture
//!
//! A run is a straight pipeline:
//! 1. **Resume**: infer the start date from the existing log when none is given
//! 2. **Collect**: scroll the search feed in a browser session, deduping by text
//! 3. **Sort**: order the tweets by post time
//! 4. **Output**: append to (or create) the Markdown log

use chrono::{Local, Utc};
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod driver;
mod errors;
mod models;
mod outputs;
mod pipeline;
mod resume;
mod scrapers;
mod utils;

use cli::Cli;
use driver::webdriver::{BrowserOptions, connect_with_backoff};
use models::display_date_at;
use pipeline::Job;
use scrapers::StdinPrompt;
use scrapers::collector::Checkpoint;
use scrapers::extractor::HtmlExtractor;
use utils::execution_time_label;

#[tokio::main(flavor = "current_thread")]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    let dotenv_loaded = dotenv::dotenv();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    if let Err(e) = dotenv_loaded {
        debug!(error = %e, "No .env file loaded");
    }

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let settings = config::load_settings(args.config.as_deref()).await?;

    let Some(username) = args.username.clone().filter(|u| !u.trim().is_empty()) else {
        error!("Username is required. Provide it as an argument or set TWITTER_USERNAME in .env");
        return Err("username is required".into());
    };

    // ---- Resolve start date ----
    let job = Job {
        username,
        output: PathBuf::from(&args.output),
        start_date: args.start_date,
        end_date: args.end_date,
    };
    let plan = pipeline::plan(&job, display_date_at(Utc::now())).await?;

    let execution_time = execution_time_label(Local::now().naive_local());
    info!(
        query = %plan.query,
        until = %args.end_date.map(|d| d.to_string()).unwrap_or_else(|| "now".to_string()),
        "Fetching tweets"
    );

    // ---- Collect and write ----
    let cwd = std::env::current_dir()?;
    let browser = BrowserOptions::from_settings(&settings, args.headless, &cwd);
    let session = connect_with_backoff(
        &args.webdriver_url,
        &browser,
        settings.poll_interval(),
        settings.connect_retries,
        settings.connect_base_delay(),
    )
    .await?;

    let checkpoint = if args.headless {
        Checkpoint::Unattended
    } else {
        Checkpoint::Attended(StdinPrompt)
    };
    let outcome = pipeline::execute(
        session,
        &HtmlExtractor,
        checkpoint,
        &settings,
        &plan,
        &execution_time,
    )
    .await?;

    let elapsed = start_time.elapsed();
    info!(
        count = outcome.written,
        path = %args.output,
        ?elapsed,
        "Saved tweets"
    );
    Ok(())
}
