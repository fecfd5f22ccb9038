use crate::crawler::CrawlContext;
use crate::model::{Issue, Manga};
use crate::site::SiteAdapter;
use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// The adapter callback a fetched document is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// `parse_genres`
    Genres,
    /// `parse_catalog`
    Catalog,
    /// `parse_latest`
    Latest,
    /// `parse_collection`
    Collection,
    /// `parse_manga`: enumerates the pages of one issue
    Issue,
    /// `parse_page`
    Page,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Genres => "genres",
            Self::Catalog => "catalog",
            Self::Latest => "latest",
            Self::Collection => "collection",
            Self::Issue => "issue",
            Self::Page => "page",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A URL to fetch, the phase its response goes to, and the carried context
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub url: Url,
    pub phase: Phase,
    pub context: CrawlContext,
}

impl FetchRequest {
    pub fn new(url: Url, phase: Phase) -> Self {
        Self {
            url,
            phase,
            context: CrawlContext::default(),
        }
    }

    pub fn with_context(url: Url, phase: Phase, context: CrawlContext) -> Self {
        Self {
            url,
            phase,
            context,
        }
    }

    /// Seed request for the genre list of a site
    pub fn genres(adapter: &dyn SiteAdapter) -> Self {
        Self::new(adapter.genres_url(), Phase::Genres)
    }

    /// Seed request for the full catalog of a site
    pub fn catalog(adapter: &dyn SiteAdapter) -> Self {
        Self::new(adapter.catalog_url(), Phase::Catalog)
    }

    /// Seed request for a latest-walk bounded by `until`
    pub fn latest(adapter: &dyn SiteAdapter, until: NaiveDate) -> Self {
        Self::with_context(
            adapter.latest_url(until),
            Phase::Latest,
            CrawlContext::new().with_until(until),
        )
    }

    /// Request for a single series detail page
    pub fn collection(url: Url) -> Self {
        let manga = Manga::with_url(url.as_str());
        Self::with_context(url, Phase::Collection, CrawlContext::new().with_manga(manga))
    }

    /// Request enumerating the pages of one issue
    ///
    /// Fails when the issue URL is not absolute.
    pub fn issue(manga: Arc<Manga>, issue: Arc<Issue>) -> Result<Self, url::ParseError> {
        let url = Url::parse(&issue.url)?;
        Ok(Self::with_context(
            url,
            Phase::Issue,
            CrawlContext::new().with_manga(manga).with_issue(issue),
        ))
    }
}
