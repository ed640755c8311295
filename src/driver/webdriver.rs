//! W3C WebDriver client implementing [`PageDriver`].
//!
//! Talks JSON over HTTP to a running `chromedriver` (or any W3C-compliant
//! server). Only the commands the collector needs are implemented:
//!
//! | Capability | WebDriver command |
//! |------------|-------------------|
//! | connect | `POST /session` |
//! | navigate | `POST /session/{id}/url` |
//! | list / wait / scroll / extent | `POST /session/{id}/execute/sync` |
//! | close | `DELETE /session/{id}` |
//!
//! # Retry Strategy
//!
//! Only session creation is retried ([`connect_with_backoff`]), since the
//! driver server is commonly started alongside this tool. Every later
//! command fails the run on the first error.
//!
//! - Exponential backoff starting at the configured base delay
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to each wait

use super::{PageDriver, RawElement};
use crate::config::Settings;
use crate::errors::DriverError;
use rand::{Rng, rng};
use reqwest::{Client, Method};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

const LIST_OUTER_HTML: &str =
    "return Array.from(document.querySelectorAll(arguments[0])).map(e => e.outerHTML);";
const COUNT_ELEMENTS: &str = "return document.querySelectorAll(arguments[0]).length;";
const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight);";
const SCROLL_HEIGHT: &str = "return document.body.scrollHeight;";

/// Browser launch options sent with the new-session request.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    /// Absolute profile directory; persisting it keeps the login cookie.
    pub profile_dir: PathBuf,
    pub user_agent: String,
}

impl BrowserOptions {
    /// Resolve the profile directory against `cwd`.
    pub fn from_settings(settings: &Settings, headless: bool, cwd: &std::path::Path) -> Self {
        Self {
            headless,
            profile_dir: cwd.join(&settings.profile_dir),
            user_agent: settings.user_agent.clone(),
        }
    }

    fn capabilities(&self) -> Value {
        let mut args = vec![
            format!("--user-data-dir={}", self.profile_dir.display()),
            format!("--user-agent={}", self.user_agent),
            "--disable-blink-features=AutomationControlled".to_string(),
            "--window-size=1920,1080".to_string(),
        ];
        if self.headless {
            args.push("--headless=new".to_string());
        }
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": args,
                        "excludeSwitches": ["enable-automation"],
                    }
                }
            }
        })
    }
}

/// An open WebDriver session.
#[derive(Debug)]
pub struct WebDriverSession {
    client: Client,
    endpoint: Url,
    session_id: String,
    poll_interval: Duration,
}

impl WebDriverSession {
    /// Open a new browser session on the WebDriver server at `endpoint`.
    #[instrument(level = "info", skip(options))]
    pub async fn connect(
        endpoint: &str,
        options: &BrowserOptions,
        poll_interval: Duration,
    ) -> Result<Self, DriverError> {
        let client = Client::new();
        let endpoint = normalize_endpoint(endpoint)?;
        let value = send(
            &client,
            Method::POST,
            endpoint.join("session")?,
            Some(options.capabilities()),
        )
        .await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::Malformed(format!("no sessionId in {value}")))?
            .to_string();

        info!(%session_id, headless = options.headless, "WebDriver session opened");
        Ok(Self {
            client,
            endpoint,
            session_id,
            poll_interval,
        })
    }

    async fn command(
        &self,
        method: Method,
        suffix: &str,
        body: Option<Value>,
    ) -> Result<Value, DriverError> {
        let path = if suffix.is_empty() {
            format!("session/{}", self.session_id)
        } else {
            format!("session/{}/{}", self.session_id, suffix)
        };
        send(&self.client, method, self.endpoint.join(&path)?, body).await
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, DriverError> {
        self.command(
            Method::POST,
            "execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
        .await
    }
}

impl PageDriver for WebDriverSession {
    #[instrument(level = "info", skip(self))]
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.command(Method::POST, "url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn wait_for_any_element(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, DriverError> {
        let deadline = Instant::now() + timeout;
        loop {
            let count = self
                .execute(COUNT_ELEMENTS, vec![json!(selector)])
                .await?
                .as_u64()
                .unwrap_or(0);
            if count > 0 {
                debug!(count, selector, "Elements present");
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn list_elements(&mut self, selector: &str) -> Result<Vec<RawElement>, DriverError> {
        let value = self.execute(LIST_OUTER_HTML, vec![json!(selector)]).await?;
        parse_outer_html_list(value)
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), DriverError> {
        self.execute(SCROLL_TO_BOTTOM, Vec::new()).await?;
        Ok(())
    }

    async fn current_scroll_extent(&mut self) -> Result<i64, DriverError> {
        let value = self.execute(SCROLL_HEIGHT, Vec::new()).await?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|h| h as i64))
            .ok_or_else(|| DriverError::Malformed(format!("scroll height was {value}")))
    }

    #[instrument(level = "info", skip(self), fields(session_id = %self.session_id))]
    async fn close(&mut self) -> Result<(), DriverError> {
        self.command(Method::DELETE, "", None).await?;
        info!("WebDriver session closed");
        Ok(())
    }
}

/// Open a session, retrying with exponential backoff and jitter.
///
/// The delay between attempts follows
/// ```text
/// delay = min(base_delay * 2^(attempt-1), 30s) + random_jitter(0..250ms)
/// ```
#[instrument(level = "info", skip(options))]
pub async fn connect_with_backoff(
    endpoint: &str,
    options: &BrowserOptions,
    poll_interval: Duration,
    max_retries: usize,
    base_delay: Duration,
) -> Result<WebDriverSession, DriverError> {
    let max_delay = Duration::from_secs(30);
    let mut attempt = 0usize;

    loop {
        match WebDriverSession::connect(endpoint, options, poll_interval).await {
            Ok(session) => return Ok(session),
            Err(e) => {
                attempt += 1;
                if attempt > max_retries {
                    error!(attempt, max = max_retries, error = %e, "connect exhausted retries");
                    return Err(e);
                }

                let shift = (attempt - 1).min(16) as u32;
                let mut delay = base_delay.saturating_mul(1 << shift);
                if delay > max_delay {
                    delay = max_delay;
                }
                let jitter_ms: u64 = rng().random_range(0..=250);
                let delay = delay + Duration::from_millis(jitter_ms);

                warn!(attempt, max = max_retries, ?delay, error = %e, "connect failed; backing off");
                sleep(delay).await;
            }
        }
    }
}

async fn send(
    client: &Client,
    method: Method,
    url: Url,
    body: Option<Value>,
) -> Result<Value, DriverError> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request.send().await?;
    let status = response.status();
    let body: Value = response.json().await?;
    let value = unwrap_value(body);

    if status.is_success() {
        Ok(value)
    } else {
        Err(protocol_error(&value))
    }
}

fn unwrap_value(mut body: Value) -> Value {
    body.get_mut("value").map(Value::take).unwrap_or(Value::Null)
}

fn protocol_error(value: &Value) -> DriverError {
    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string()
    };
    DriverError::Protocol {
        error: field("error"),
        message: field("message"),
    }
}

fn parse_outer_html_list(value: Value) -> Result<Vec<RawElement>, DriverError> {
    match value {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(html) => Some(RawElement::new(html)),
                _ => None,
            })
            .collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(DriverError::Malformed(format!(
            "expected an array of strings, got {other}"
        ))),
    }
}

/// Parse the endpoint so relative joins keep its path.
fn normalize_endpoint(endpoint: &str) -> Result<Url, DriverError> {
    let mut url = Url::parse(endpoint)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(headless: bool) -> BrowserOptions {
        BrowserOptions {
            headless,
            profile_dir: PathBuf::from("/tmp/profile"),
            user_agent: "test-agent".to_string(),
        }
    }

    fn chrome_args(options: &BrowserOptions) -> Vec<String> {
        options.capabilities()["capabilities"]["alwaysMatch"]["goog:chromeOptions"]["args"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a.as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_capabilities_headless_flag() {
        assert!(chrome_args(&options(true)).contains(&"--headless=new".to_string()));
        assert!(!chrome_args(&options(false)).iter().any(|a| a.starts_with("--headless")));
    }

    #[test]
    fn test_capabilities_keep_profile_and_agent() {
        let args = chrome_args(&options(false));
        assert!(args.contains(&"--user-data-dir=/tmp/profile".to_string()));
        assert!(args.contains(&"--user-agent=test-agent".to_string()));
    }

    #[test]
    fn test_normalize_endpoint_keeps_path_prefix() {
        let url = normalize_endpoint("http://localhost:4444/wd/hub").unwrap();
        assert_eq!(
            url.join("session").unwrap().as_str(),
            "http://localhost:4444/wd/hub/session"
        );
        let url = normalize_endpoint("http://localhost:9515").unwrap();
        assert_eq!(url.join("session").unwrap().as_str(), "http://localhost:9515/session");
    }

    #[test]
    fn test_protocol_error_fields() {
        let body = json!({ "value": { "error": "no such window", "message": "target closed" } });
        match protocol_error(&unwrap_value(body)) {
            DriverError::Protocol { error, message } => {
                assert_eq!(error, "no such window");
                assert_eq!(message, "target closed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_outer_html_list() {
        let elements = parse_outer_html_list(json!(["<article>a</article>", 3, "<article>b</article>"])).unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[1].html, "<article>b</article>");
        assert!(parse_outer_html_list(Value::Null).unwrap().is_empty());
        assert!(parse_outer_html_list(json!({ "oops": true })).is_err());
    }
}
