//! Browsing-session abstraction used by the collection loop.
//!
//! The collector only needs a handful of capabilities from a browser:
//! navigate, wait for posts, list them, scroll, and measure the page. They
//! are expressed by [`PageDriver`] so the loop can be driven by a real
//! WebDriver session ([`webdriver::WebDriverSession`]) or by a scripted fake
//! in tests.
//!
//! # Element handles
//!
//! A [`RawElement`] is a snapshot of one post element's outer HTML. It is
//! taken at listing time, so handles never go stale when the feed
//! re-renders under a scroll.

pub mod webdriver;

use crate::errors::DriverError;
use std::time::Duration;

/// Opaque snapshot of one post element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawElement {
    /// Outer HTML of the element at the time it was listed.
    pub html: String,
}

impl RawElement {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }
}

/// Capabilities the collection loop consumes from a browsing session.
///
/// Calls are awaited one at a time; implementations need not be `Sync`.
pub trait PageDriver {
    /// Load `url` in the current tab.
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    /// Poll until at least one element matches `selector`.
    ///
    /// Returns `Ok(false)` when `timeout` elapses first.
    async fn wait_for_any_element(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, DriverError>;

    /// Snapshot every element currently matching `selector`.
    async fn list_elements(&mut self, selector: &str) -> Result<Vec<RawElement>, DriverError>;

    /// Scroll the window to the bottom of the document.
    async fn scroll_to_bottom(&mut self) -> Result<(), DriverError>;

    /// Current scrollable height of the document, in pixels.
    async fn current_scroll_extent(&mut self) -> Result<i64, DriverError>;

    /// Release the session. Called exactly once, on every exit path.
    async fn close(&mut self) -> Result<(), DriverError>;
}

impl<D: PageDriver> PageDriver for &mut D {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        (**self).navigate(url).await
    }

    async fn wait_for_any_element(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, DriverError> {
        (**self).wait_for_any_element(selector, timeout).await
    }

    async fn list_elements(&mut self, selector: &str) -> Result<Vec<RawElement>, DriverError> {
        (**self).list_elements(selector).await
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), DriverError> {
        (**self).scroll_to_bottom().await
    }

    async fn current_scroll_extent(&mut self) -> Result<i64, DriverError> {
        (**self).current_scroll_extent().await
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        (**self).close().await
    }
}
