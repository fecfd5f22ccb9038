//! Robots.txt handling module
//!
//! This module fetches, parses and caches robots.txt files for the HTTP
//! fetcher. A robots.txt that cannot be retrieved allows everything.

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache};
pub use parser::ParsedRobots;

use reqwest::Client;
use url::Url;

/// Origin key (`scheme://host:port`) of a URL's robots.txt
pub fn robots_origin(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Fetches and parses robots.txt for the host of `url`
///
/// # Returns
///
/// The parsed rules; `ParsedRobots::allow_all()` when the file is missing,
/// the server errors, or the request fails.
pub async fn fetch_robots(client: &Client, url: &Url) -> ParsedRobots {
    let Ok(robots_url) = url.join("/robots.txt") else {
        return ParsedRobots::allow_all();
    };

    match client.get(robots_url.clone()).send().await {
        Ok(response) if response.status().is_success() => match response.text().await {
            Ok(body) => {
                tracing::debug!("Loaded {} ({} bytes)", robots_url, body.len());
                ParsedRobots::from_content(&body)
            }
            Err(e) => {
                tracing::debug!("Unreadable {}: {}", robots_url, e);
                ParsedRobots::allow_all()
            }
        },
        Ok(response) => {
            tracing::debug!("No robots.txt at {} ({})", robots_url, response.status());
            ParsedRobots::allow_all()
        }
        Err(e) => {
            tracing::debug!("Failed to fetch {}: {}", robots_url, e);
            ParsedRobots::allow_all()
        }
    }
}
