//! Runtime settings for the collector and the browser session.
//!
//! Every field has a default, so the YAML file is optional and may set only
//! the values it wants to change:
//!
//! ```yaml
//! initial_settle_secs: 5
//! scroll_settle_secs: 4
//! timestamp_fallback: discard
//! ```

use serde::Deserialize;
use std::error::Error;
use std::time::Duration;
use tracing::{info, instrument};

/// What to do with a post whose timestamp is missing or malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimestampFallback {
    /// Stamp the post with the current time (degraded accuracy).
    #[default]
    WallClock,
    /// Treat the element as a parse failure and skip it.
    Discard,
}

/// Settings loaded from the optional YAML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Search page the query string is appended to.
    pub search_base_url: String,
    /// CSS selector matching one post element.
    pub post_selector: String,
    /// Fixed wait after navigation before looking for posts.
    pub initial_settle_secs: u64,
    /// How long to wait for the first post before assuming a login wall.
    pub load_timeout_secs: u64,
    /// Grace period before re-scanning an empty page once.
    pub empty_retry_secs: u64,
    /// Fixed wait after each scroll before measuring the page again.
    pub scroll_settle_secs: u64,
    /// Interval between element-presence polls.
    pub poll_interval_ms: u64,
    pub timestamp_fallback: TimestampFallback,
    /// Browser profile directory, relative to the working directory.
    pub profile_dir: String,
    pub user_agent: String,
    /// Session creation attempts beyond the first.
    pub connect_retries: usize,
    pub connect_base_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            search_base_url: "https://x.com/search".to_string(),
            post_selector: "article".to_string(),
            initial_settle_secs: 10,
            load_timeout_secs: 10,
            empty_retry_secs: 5,
            scroll_settle_secs: 3,
            poll_interval_ms: 500,
            timestamp_fallback: TimestampFallback::WallClock,
            profile_dir: "chrome_profile".to_string(),
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            connect_retries: 5,
            connect_base_delay_ms: 1000,
        }
    }
}

impl Settings {
    pub fn initial_settle(&self) -> Duration {
        Duration::from_secs(self.initial_settle_secs)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    pub fn empty_retry(&self) -> Duration {
        Duration::from_secs(self.empty_retry_secs)
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_secs(self.scroll_settle_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn connect_base_delay(&self) -> Duration {
        Duration::from_millis(self.connect_base_delay_ms)
    }
}

/// Load settings from `path`, or the defaults when no path is given.
#[instrument(level = "info")]
pub async fn load_settings(path: Option<&str>) -> Result<Settings, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let raw = tokio::fs::read_to_string(path).await?;
    let settings = parse_settings(&raw)?;
    info!(config_path = path, "Loaded settings");
    Ok(settings)
}

fn parse_settings(raw: &str) -> Result<Settings, serde_yaml::Error> {
    if raw.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(raw)
}
