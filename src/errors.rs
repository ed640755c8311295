//! Error types shared across the scraper, resume logic, and driver.
//!
//! Per-element parse failures are not represented here: they are logged and
//! the element is skipped. A missing-content timeout is not an error either;
//! it routes the collection loop to the login-wall checkpoint.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by a page driver.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The HTTP round-trip to the WebDriver server failed.
    #[error("webdriver request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The WebDriver server answered with an error object.
    #[error("webdriver error `{error}`: {message}")]
    Protocol { error: String, message: String },
    /// The response did not have the expected shape.
    #[error("unexpected webdriver response: {0}")]
    Malformed(String),
    /// The endpoint URL could not be parsed or joined.
    #[error("invalid webdriver endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// Causes that abort a collection run.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error(transparent)]
    Driver(#[from] DriverError),
    /// Waiting for the operator at the login wall failed.
    #[error("operator checkpoint failed: {0}")]
    Operator(#[source] io::Error),
}

/// Reasons a start date could not be inferred from an existing log.
#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The log has no marker line carrying a `MM/DD` field.
    #[error("no dated entry found in {}", .0.display())]
    NoDatedEntry(PathBuf),
    /// The last recorded `MM/DD` is not a calendar day in any candidate year.
    #[error("recorded date {month:02}/{day:02} is not a valid calendar day")]
    InvalidDay { month: u32, day: u32 },
}

/// Conditions that end a whole download run before anything is written.
#[derive(Debug, Error)]
pub enum RunError {
    /// No start date was given and none could be inferred from the log.
    #[error("cannot determine start date for {}", .0.display())]
    NoStartDate(PathBuf),
    /// The feed sat behind a login wall with nobody to log in.
    #[error("login wall in headless mode")]
    LoginWall,
}
