//! Command-line interface definitions for the tweet downloader.
//!
//! Options can be passed as arguments or, for the username and WebDriver
//! endpoint, through environment variables (a `.env` file in the working
//! directory is loaded first).

use crate::utils::parse_ymd;
use chrono::NaiveDate;
use clap::Parser;

/// Download a user's posts in a date range into a Markdown log.
///
/// # Examples
///
/// ```sh
/// # Explicit window
/// tweet_downloader jack 2024-01-01 2024-02-01
///
/// # Continue from the last date already in tweets.md
/// TWITTER_USERNAME=jack tweet_downloader
///
/// # Unattended run against a remote chromedriver
/// tweet_downloader jack 2024-01-01 --headless --webdriver-url http://127.0.0.1:4444
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Account name, without the leading @
    #[arg(env = "TWITTER_USERNAME")]
    pub username: Option<String>,

    /// First day to fetch (YYYY-MM-DD); inferred from the output file when omitted
    #[arg(value_parser = parse_ymd)]
    pub start_date: Option<NaiveDate>,

    /// Day to stop before (YYYY-MM-DD); defaults to now
    #[arg(value_parser = parse_ymd)]
    pub end_date: Option<NaiveDate>,

    /// Run the browser headless (a login wall then aborts the run)
    #[arg(long)]
    pub headless: bool,

    /// Output file name
    #[arg(short, long, default_value = "tweets.md")]
    pub output: String,

    /// Optional path to a YAML settings file
    #[arg(short, long)]
    pub config: Option<String>,

    /// WebDriver server endpoint
    #[arg(long, env = "WEBDRIVER_URL", default_value = "http://localhost:9515")]
    pub webdriver_url: String,
}
