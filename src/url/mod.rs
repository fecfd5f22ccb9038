//! URL handling module for Tankobon
//!
//! This module provides host extraction, allowed-domain matching and the
//! dedup key used by the crawl engine's seen-URL set.

mod matcher;
mod normalize;

pub use matcher::domain_matches;
pub use normalize::dedup_key;

use crate::{UrlError, UrlResult};
use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use tankobon::url::extract_domain;
///
/// let url = Url::parse("http://WWW.MangaHere.co/manga/a/").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.mangahere.co".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks a URL against an allowed-domain list
///
/// Only `http` and `https` URLs with a host can ever be allowed; an empty
/// list allows nothing.
pub fn is_allowed(url: &Url, allowed_domains: &[String]) -> bool {
    if url.scheme() != "http" && url.scheme() != "https" {
        return false;
    }

    match extract_domain(url) {
        Some(host) => allowed_domains
            .iter()
            .any(|pattern| domain_matches(pattern, &host)),
        None => false,
    }
}

/// Parses an absolute `http(s)` URL
pub fn parse_http_url(raw: &str) -> UrlResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}
