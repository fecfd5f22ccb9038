//! Adapter for MangaHere
//!
//! MangaHere answers missing series with HTTP 200 and a `div.error_404`
//! body, hides licensed series behind a notice in the detail list, and
//! lists issues newest first.

use crate::crawler::{CrawlContext, Document, FetchRequest, LatestListing, Phase};
use crate::model::{Genres, Issue, IssuePage, Manga, RankOrder, ReadingDirection};
use crate::site::extract::{
    clean_text, labelled_row, loose_u32, own_text, select_attr, select_attrs, select_texts,
    selector, split_list, texts_within, trailing_number,
};
use crate::site::{parse_loose_date, SiteAdapter};
use chrono::NaiveDate;
use scraper::ElementRef;
use std::sync::Arc;
use url::Url;

const BASE_URL: &str = "http://www.mangahere.co/";

const SOFT_404: &str = "div.error_404";
const LICENSED: &str = "div.detail_list > div.mt10.color_ff00.mb10";
const ISSUE_ROWS: &str = "div.detail_list > ul:not([class]) > li";
const NO_ISSUES: &str = "No Manga Chapter";

/// MangaHere site adapter
#[derive(Debug, Clone)]
pub struct MangaHere {
    allowed_domains: Vec<String>,
    genres_url: Url,
    catalog_url: Url,
    latest_url: Url,
}

impl MangaHere {
    /// Adapter for the production site
    pub fn new() -> Result<Self, url::ParseError> {
        Self::with_base(Url::parse(BASE_URL)?)
    }

    /// Adapter rooted at `base`, e.g. a local mirror
    ///
    /// The allowed domains are derived from the base host, dropping a
    /// leading `www.` so sibling hosts (image CDNs) stay reachable.
    pub fn with_base(base: Url) -> Result<Self, url::ParseError> {
        let host = base
            .host_str()
            .map(|h| h.to_ascii_lowercase())
            .unwrap_or_default();
        let domain = host.strip_prefix("www.").unwrap_or(&host).to_string();

        Ok(Self {
            allowed_domains: vec![domain],
            genres_url: base.join("advsearch.htm")?,
            catalog_url: base.join("mangalist/")?,
            latest_url: base.join("latest/")?,
        })
    }

    fn parse_issues(&self, doc: &Document, rows: &[ElementRef<'_>], manga_url: &str) -> Vec<Issue> {
        let total = rows.len() as u32;

        rows.iter()
            .enumerate()
            .map(|(index, row)| {
                let mut issue = Issue::new(manga_url, "");
                let link_text = texts_within(row, "a").join(" ");

                let mut name_parts = texts_within(row, "a");
                name_parts.extend(own_texts_within(row, "span.mr6"));
                name_parts.extend(own_texts_within(row, "span.left"));
                issue.name = clean_text(&name_parts.join(" "));

                issue.number = trailing_number(&link_text);
                issue.order = total - index as u32;
                issue.release = texts_within(row, "span.right")
                    .first()
                    .and_then(|text| parse_loose_date(text, doc.fetched_on()));
                issue.language = "EN".to_string();
                issue.url = first_href(row)
                    .and_then(|href| doc.urljoin(&href))
                    .map(String::from)
                    .unwrap_or_default();
                issue
            })
            .collect()
    }
}

impl SiteAdapter for MangaHere {
    fn name(&self) -> &str {
        "mangahere"
    }

    fn allowed_domains(&self) -> &[String] {
        &self.allowed_domains
    }

    fn genres_url(&self) -> Url {
        self.genres_url.clone()
    }

    fn catalog_url(&self) -> Url {
        self.catalog_url.clone()
    }

    fn latest_url(&self, _until: NaiveDate) -> Url {
        self.latest_url.clone()
    }

    fn parse_genres(&self, doc: &Document) -> Genres {
        Genres {
            names: select_texts(doc.html(), "a.either"),
        }
    }

    fn parse_catalog(&self, doc: &Document) -> Vec<FetchRequest> {
        select_attrs(doc.html(), "a.manga_info", "href")
            .iter()
            .filter_map(|href| doc.urljoin(href))
            .map(FetchRequest::collection)
            .collect()
    }

    fn parse_collection(&self, doc: &Document, partial: Option<&Manga>) -> Option<Manga> {
        let html = doc.html();

        if selector(SOFT_404).is_some_and(|sel| doc.has(&sel)) {
            tracing::trace!("Soft-404 at {}", doc.url());
            return None;
        }

        if selector(LICENSED).is_some_and(|sel| doc.has(&sel)) {
            tracing::trace!("Licensed series at {}", doc.url());
            return None;
        }

        let rows: Vec<ElementRef<'_>> = match selector(ISSUE_ROWS) {
            Some(sel) => html.select(&sel).collect(),
            None => Vec::new(),
        };

        if rows.len() == 1 && rows[0].html().contains(NO_ISSUES) {
            tracing::trace!("Series without issues at {}", doc.url());
            return None;
        }

        let mut manga = partial.cloned().unwrap_or_default();
        manga.url = doc.url().to_string();
        manga.name = select_attr(html, "meta[property='og:title']", "content")
            .map(|name| clean_text(&name))
            .unwrap_or_default();

        manga.alt_name = labelled_row(html, "Alternative Name:")
            .map(|row| split_list(&own_text(&row), ';').into_iter().collect())
            .unwrap_or_default();
        manga.author = labelled_row(html, "Author(s):")
            .map(|row| texts_within(&row, "a"))
            .unwrap_or_default();
        manga.artist = labelled_row(html, "Artist(s):")
            .map(|row| texts_within(&row, "a"))
            .unwrap_or_default();
        manga.reading_direction = ReadingDirection::RL;
        manga.status = labelled_row(html, "Status:")
            .map(|row| own_text(&row))
            .unwrap_or_default();
        manga.genres = labelled_row(html, "Genre(s):")
            .map(|row| split_list(&own_text(&row), ',').into_iter().collect())
            .unwrap_or_default();
        manga.rank = labelled_row(html, "Rank:").and_then(|row| loose_u32(&own_text(&row)));
        manga.rank_order = RankOrder::Asc;
        manga.description = labelled_row(html, "Summary:")
            .and_then(|row| own_texts_within(&row, "p#show").into_iter().next())
            .unwrap_or_default();
        manga.cover_image_url = select_attr(html, "img.img", "src")
            .and_then(|src| doc.urljoin(&src))
            .map(String::from)
            .unwrap_or_default();

        manga.issues = self.parse_issues(doc, &rows, &manga.url);
        Some(manga)
    }

    fn latest_listing(&self, doc: &Document) -> LatestListing {
        let html = doc.html();

        LatestListing {
            series: select_attrs(html, "a.manga_info", "href")
                .iter()
                .filter_map(|href| doc.urljoin(href))
                .collect(),
            stamps: select_texts(html, "span.time")
                .iter()
                .map(|text| parse_loose_date(text, doc.fetched_on()))
                .collect(),
            next_page: select_attr(html, "a.next", "href").and_then(|href| doc.urljoin(&href)),
        }
    }

    fn parse_manga(
        &self,
        doc: &Document,
        manga: &Arc<Manga>,
        issue: &Arc<Issue>,
    ) -> Vec<FetchRequest> {
        // The page selector is repeated at the bottom; the first one is enough.
        let Some(select) = selector("select.wid60")
            .and_then(|sel| doc.html().select(&sel).next())
        else {
            return Vec::new();
        };
        let Some(options) = selector("option") else {
            return Vec::new();
        };

        let context = CrawlContext::new()
            .with_manga(manga.clone())
            .with_issue(issue.clone());

        select
            .select(&options)
            .filter_map(|option| option.value().attr("value"))
            .enumerate()
            .filter_map(|(index, value)| {
                let url = doc.urljoin(value)?;
                Some(FetchRequest::with_context(
                    url,
                    Phase::Page,
                    context.clone().with_number(index as u32 + 1),
                ))
            })
            .collect()
    }

    fn parse_page(&self, doc: &Document, manga: &Manga, issue: &Issue, number: u32) -> IssuePage {
        IssuePage {
            manga_url: manga.url.clone(),
            issue_url: issue.url.clone(),
            number,
            image_url: select_attr(doc.html(), "img#image", "src")
                .and_then(|src| doc.urljoin(&src))
                .map(String::from)
                .unwrap_or_default(),
        }
    }
}

/// Own text of each descendant matching `css`, empty ones dropped
fn own_texts_within(element: &ElementRef<'_>, css: &str) -> Vec<String> {
    let Some(sel) = selector(css) else {
        return Vec::new();
    };

    element
        .select(&sel)
        .map(|el| own_text(&el))
        .filter(|text| !text.is_empty())
        .collect()
}

fn first_href(element: &ElementRef<'_>) -> Option<String> {
    let sel = selector("a[href]")?;
    element
        .select(&sel)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}
