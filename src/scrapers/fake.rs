//! Scripted doubles for exercising the collection loop without a browser.

use super::collector::OperatorSignal;
use super::extractor::MarkupExtractor;
use crate::config::Settings;
use crate::driver::{PageDriver, RawElement};
use crate::errors::DriverError;
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

/// Page driver that replays scripted listings and scroll extents.
///
/// `list_elements` pops one listing per call (empty once exhausted) and
/// `current_scroll_extent` pops one extent per call (an error once
/// exhausted, which simulates a dead browser).
#[derive(Debug, Default)]
pub struct FakeDriver {
    pub fail_navigation: bool,
    pub posts_present: bool,
    pub listings: VecDeque<Vec<RawElement>>,
    pub extents: VecDeque<i64>,
    pub navigated_to: Vec<String>,
    pub list_calls: usize,
    pub scroll_calls: usize,
    pub close_calls: usize,
}

impl FakeDriver {
    pub fn new(listings: Vec<Vec<&str>>, extents: Vec<i64>) -> Self {
        Self {
            posts_present: true,
            listings: listings
                .into_iter()
                .map(|page| page.into_iter().map(RawElement::new).collect())
                .collect(),
            extents: extents.into(),
            ..Self::default()
        }
    }
}

impl PageDriver for FakeDriver {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        if self.fail_navigation {
            return Err(DriverError::Malformed("net::ERR_NAME_NOT_RESOLVED".to_string()));
        }
        self.navigated_to.push(url.to_string());
        Ok(())
    }

    async fn wait_for_any_element(
        &mut self,
        _selector: &str,
        _timeout: Duration,
    ) -> Result<bool, DriverError> {
        Ok(self.posts_present)
    }

    async fn list_elements(&mut self, _selector: &str) -> Result<Vec<RawElement>, DriverError> {
        self.list_calls += 1;
        Ok(self.listings.pop_front().unwrap_or_default())
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), DriverError> {
        self.scroll_calls += 1;
        Ok(())
    }

    async fn current_scroll_extent(&mut self) -> Result<i64, DriverError> {
        self.extents
            .pop_front()
            .ok_or_else(|| DriverError::Malformed("session deleted".to_string()))
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.close_calls += 1;
        Ok(())
    }
}

/// Reads `text|timestamp` from the element body; `-` marks an absent field.
#[derive(Debug, Default)]
pub struct PipeExtractor;

fn pipe_field(element: &RawElement, index: usize) -> Option<String> {
    let (text, ts) = element.html.split_once('|')?;
    let field = if index == 0 { text } else { ts };
    (field != "-").then(|| field.to_string())
}

impl MarkupExtractor for PipeExtractor {
    fn extract_text(&self, element: &RawElement) -> Option<String> {
        pipe_field(element, 0)
    }

    fn extract_timestamp(&self, element: &RawElement) -> Option<String> {
        pipe_field(element, 1)
    }
}

/// Operator signal that counts confirmations, optionally failing.
#[derive(Debug, Default)]
pub struct CountingSignal {
    pub calls: usize,
    pub fail: bool,
}

impl OperatorSignal for &mut CountingSignal {
    async fn wait_for_operator(&mut self) -> io::Result<()> {
        self.calls += 1;
        if self.fail {
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"))
        } else {
            Ok(())
        }
    }
}

/// Settings with every wait set to zero.
pub fn instant_settings() -> Settings {
    Settings {
        initial_settle_secs: 0,
        load_timeout_secs: 0,
        empty_retry_secs: 0,
        scroll_settle_secs: 0,
        poll_interval_ms: 0,
        ..Settings::default()
    }
}
