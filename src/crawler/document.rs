//! Parsed markup handed to site adapters
//!
//! `scraper::Html` is not `Send`, so a `Document` is built, parsed and
//! dropped inside one synchronous dispatch and never crosses an await.

use chrono::NaiveDate;
use scraper::{Html, Selector};
use url::Url;

/// A fetched page: final URL, fetch date and parsed HTML
pub struct Document {
    url: Url,
    fetched_on: NaiveDate,
    html: Html,
}

impl Document {
    /// Parses `body` as an HTML document fetched from `url` on `fetched_on`
    ///
    /// # Arguments
    ///
    /// * `url` - Final URL of the response, used to resolve relative links
    /// * `body` - The HTML content
    /// * `fetched_on` - Date relative timestamps ("2 days ago") resolve against
    pub fn parse(url: Url, body: &str, fetched_on: NaiveDate) -> Self {
        Self {
            url,
            fetched_on,
            html: Html::parse_document(body),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn fetched_on(&self) -> NaiveDate {
        self.fetched_on
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Whether at least one element matches `selector`
    pub fn has(&self, selector: &Selector) -> bool {
        self.html.select(selector).next().is_some()
    }

    /// Resolves a link href against the document URL
    ///
    /// Returns None if the link should be excluded:
    /// - javascript:, mailto:, tel: schemes
    /// - data: URIs
    /// - fragment-only anchors
    /// - Non-HTTP(S) URLs after resolution
    pub fn urljoin(&self, href: &str) -> Option<Url> {
        let href = href.trim();

        if href.is_empty() || href.starts_with('#') {
            return None;
        }

        if href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
            || href.starts_with("data:")
        {
            return None;
        }

        let absolute = self.url.join(href).ok()?;
        match absolute.scheme() {
            "http" | "https" => Some(absolute),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("url", &self.url.as_str())
            .field("fetched_on", &self.fetched_on)
            .finish_non_exhaustive()
    }
}
