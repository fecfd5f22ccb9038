//! Per-site extraction contract and its implementations
//!
//! A `SiteAdapter` turns a fetched `Document` (plus the context carried by
//! its request) into entities or follow-up `FetchRequest`s. Adapters do no
//! I/O and hold no mutable state; the engine owns every effect.
//!
//! # Components
//!
//! - `SiteAdapter`: the capability set every site implements
//! - `adapter_for` / `available_sites`: lookup by site name
//! - `extract`: tolerant selector helpers shared by adapters
//! - `parse_loose_date`: the date forms listing pages print

pub mod extract;

mod dates;
mod mangahere;

pub use dates::parse_loose_date;
pub use mangahere::MangaHere;

use crate::crawler::{Document, FetchRequest, LatestListing, LatestWalk};
use crate::model::{Genres, Issue, IssuePage, Manga};
use crate::CrawlError;
use chrono::NaiveDate;
use std::sync::Arc;
use url::Url;

/// Extraction contract of one target site
///
/// Field extraction never fails: a selector matching nothing yields the
/// field's empty default. Only the structural checks in `parse_collection`
/// (soft-404, licensed, no issues) short-circuit a parse.
pub trait SiteAdapter: Send + Sync {
    /// Registry name of the site
    fn name(&self) -> &str;

    /// Domains this adapter's requests are restricted to (wildcards allowed)
    fn allowed_domains(&self) -> &[String];

    fn genres_url(&self) -> Url;

    fn catalog_url(&self) -> Url;

    fn latest_url(&self, until: NaiveDate) -> Url;

    fn parse_genres(&self, doc: &Document) -> Genres;

    /// One `Collection` request per series listed on this catalog page
    fn parse_catalog(&self, doc: &Document) -> Vec<FetchRequest>;

    /// Parses a series detail page, `None` for pages that hold no real content
    fn parse_collection(&self, doc: &Document, partial: Option<&Manga>) -> Option<Manga>;

    /// Raw facts of one "latest updates" listing page
    fn latest_listing(&self, doc: &Document) -> LatestListing;

    /// One `Issue` request per page of `issue`, numbered from 1
    fn parse_manga(
        &self,
        doc: &Document,
        manga: &Arc<Manga>,
        issue: &Arc<Issue>,
    ) -> Vec<FetchRequest>;

    fn parse_page(&self, doc: &Document, manga: &Manga, issue: &Issue, number: u32) -> IssuePage;

    /// Series requests of a listing page, plus the next-page request while
    /// the walk bounded by `until` continues
    fn parse_latest(&self, doc: &Document, until: NaiveDate) -> Vec<FetchRequest> {
        let listing = self.latest_listing(doc);
        let mut walk = LatestWalk::new(until);

        let mut requests: Vec<FetchRequest> = listing
            .series
            .iter()
            .cloned()
            .map(FetchRequest::collection)
            .collect();

        if let Some(next) = walk.advance(&listing.stamps, listing.next_page) {
            requests.push(next);
        }

        requests
    }

    /// Whether `url` is inside the declared domains
    fn allows(&self, url: &Url) -> bool {
        crate::url::is_allowed(url, self.allowed_domains())
    }
}

/// Names accepted by `adapter_for`
pub fn available_sites() -> &'static [&'static str] {
    &["mangahere"]
}

/// Looks up the production adapter registered under `name`
pub fn adapter_for(name: &str) -> Result<Arc<dyn SiteAdapter>, CrawlError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "mangahere" => Ok(Arc::new(MangaHere::new()?)),
        _ => Err(CrawlError::UnknownSite(name.to_string())),
    }
}
