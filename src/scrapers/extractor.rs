//! Field extraction from one post element's markup.
//!
//! [`HtmlExtractor`] reads the outer HTML captured by the driver with the
//! `scraper` crate. The live feed marks the pieces we need with stable
//! attributes:
//!
//! - body: `div[data-testid="tweetText"]`, with emoji rendered as `<img alt>`
//! - time: `<time datetime="2023-12-01T12:00:00.000Z">`
//! - author: the `/<handle>/status/<id>` permalink

use crate::driver::RawElement;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Node, Selector};

static TWEET_TEXT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"div[data-testid="tweetText"]"#).unwrap());
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static STATUS_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/([A-Za-z0-9_]+)/status/\d+").unwrap());

/// Raw fields of one post element, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields {
    pub text: Option<String>,
    pub timestamp: Option<String>,
    pub author: Option<String>,
}

/// Pulls the raw fields out of one post element.
pub trait MarkupExtractor {
    /// Raw body text, or `None` when the element has no body node.
    fn extract_text(&self, element: &RawElement) -> Option<String>;

    /// Raw `YYYY-MM-DDTHH:MM:SS.fffZ` timestamp string.
    fn extract_timestamp(&self, element: &RawElement) -> Option<String>;

    /// Author handle, if the markup exposes one.
    fn extract_author(&self, _element: &RawElement) -> Option<String> {
        None
    }

    /// All fields at once. Override when reading the element is costly.
    fn extract(&self, element: &RawElement) -> RawFields {
        RawFields {
            text: self.extract_text(element),
            timestamp: self.extract_timestamp(element),
            author: self.extract_author(element),
        }
    }
}

/// [`MarkupExtractor`] for the X web client's post markup.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlExtractor;

impl MarkupExtractor for HtmlExtractor {
    fn extract_text(&self, element: &RawElement) -> Option<String> {
        text_of(&Html::parse_fragment(&element.html))
    }

    fn extract_timestamp(&self, element: &RawElement) -> Option<String> {
        timestamp_of(&Html::parse_fragment(&element.html))
    }

    fn extract_author(&self, element: &RawElement) -> Option<String> {
        author_of(&Html::parse_fragment(&element.html))
    }

    fn extract(&self, element: &RawElement) -> RawFields {
        let fragment = Html::parse_fragment(&element.html);
        RawFields {
            text: text_of(&fragment),
            timestamp: timestamp_of(&fragment),
            author: author_of(&fragment),
        }
    }
}

fn text_of(fragment: &Html) -> Option<String> {
    let body = fragment.select(&TWEET_TEXT).next()?;

    let mut text = String::new();
    for node in body.descendants() {
        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(e) if e.name() == "img" => {
                if let Some(alt) = e.attr("alt") {
                    text.push_str(alt);
                }
            }
            _ => {}
        }
    }
    Some(text)
}

fn timestamp_of(fragment: &Html) -> Option<String> {
    let time = fragment.select(&TIME).next()?;
    time.value().attr("datetime").map(str::to_string)
}

fn author_of(fragment: &Html) -> Option<String> {
    fragment
        .select(&LINK)
        .filter_map(|a| a.value().attr("href"))
        .find_map(|href| {
            STATUS_PATH
                .captures(href)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        })
}
