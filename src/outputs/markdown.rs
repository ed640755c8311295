//! Markdown log writer.
//!
//! # Append vs Replace
//!
//! | Output file exists | Start date in effect | Mode |
//! |--------------------|----------------------|------|
//! | no | any | create |
//! | yes | yes | append |
//! | yes | no | overwrite |
//!
//! Appending does not check new lines against what the file already holds,
//! so runs with overlapping date windows can repeat entries.

use crate::models::Tweet;
use std::error::Error;
use std::fmt::Write;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

/// How the output file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Create the file, or truncate it if it exists.
    Create,
    /// Keep existing lines and add after them.
    Append,
}

/// Pick the write mode from the decision table above.
pub fn choose_write_mode(file_exists: bool, start_date_in_effect: bool) -> WriteMode {
    if file_exists && start_date_in_effect {
        WriteMode::Append
    } else {
        WriteMode::Create
    }
}

/// Render `tweets` as log lines, in the given order.
pub fn render_lines(tweets: &[Tweet], execution_time: &str) -> String {
    let mut out = String::new();
    for tweet in tweets {
        writeln!(out, "{}", tweet.to_markdown(execution_time)).unwrap();
    }
    out
}

/// Write `tweets` (already sorted) to `path` in one open/write/flush.
///
/// # Arguments
///
/// * `path` - Output log file
/// * `tweets` - Records in ascending time order
/// * `execution_time` - `HH:MM` label of this run, prefixed to every line
/// * `mode` - See [`choose_write_mode`]
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = tweets.len(), mode = ?mode))]
pub async fn write_markdown(
    path: &Path,
    tweets: &[Tweet],
    execution_time: &str,
    mode: WriteMode,
) -> Result<(), Box<dyn Error>> {
    let body = render_lines(tweets, execution_time);

    let mut options = tokio::fs::OpenOptions::new();
    options.create(true);
    match mode {
        WriteMode::Append => options.append(true),
        WriteMode::Create => options.write(true).truncate(true),
    };

    let mut file = options.open(path).await?;
    file.write_all(body.as_bytes()).await?;
    file.flush().await?;
    info!("Wrote tweet log");
    Ok(())
}
