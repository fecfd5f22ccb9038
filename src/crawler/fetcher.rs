//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - Per-domain spacing between requests
//! - robots.txt checks
//! - Error classification into transient and permanent failures
//!
//! The engine only sees the `Fetcher` trait, so tests and other transports
//! can stand in for `HttpFetcher`.

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::robots::{fetch_robots, robots_origin, RobotsCache};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

/// A successfully fetched response body
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,
    pub status: u16,
    pub body: String,
}

/// Why a fetch produced no document
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    #[error("connection failed for {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("{url} is disallowed by robots.txt")]
    RobotsDenied { url: String },

    #[error("{url} is not HTML ({content_type})")]
    ContentMismatch { url: String, content_type: String },

    #[error("failed to read body of {url}: {reason}")]
    Body { url: String, reason: String },
}

impl FetchError {
    /// Whether retrying the same request may succeed
    ///
    /// | Condition | Class |
    /// |-----------|-------|
    /// | Timeout, connection failure | transient |
    /// | HTTP 408, 429, 5xx | transient |
    /// | Other HTTP 4xx | permanent |
    /// | robots.txt denial, non-HTML body | permanent |
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Connect { .. } | Self::Body { .. } => true,
            Self::Status { status, .. } => {
                *status == 408 || *status == 429 || (500..600).contains(status)
            }
            Self::RobotsDenied { .. } | Self::ContentMismatch { .. } => false,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url }
            | Self::Connect { url, .. }
            | Self::Status { url, .. }
            | Self::RobotsDenied { url }
            | Self::ContentMismatch { url, .. }
            | Self::Body { url, .. } => url,
        }
    }
}

/// Retrieves documents for the engine
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

/// Formats the identifying user agent
///
/// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use tankobon::config::UserAgentConfig;
/// use tankobon::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "tankobon".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Polite reqwest-backed fetcher
///
/// Requests to one host are spaced by at least the configured minimum (or
/// the host's robots.txt `Crawl-delay`, whichever is larger).
pub struct HttpFetcher {
    client: Client,
    robots_agent: String,
    respect_robots: bool,
    min_spacing: Duration,
    next_slot: Mutex<HashMap<String, Instant>>,
    robots: Mutex<RobotsCache>,
}

impl HttpFetcher {
    pub fn new(
        client: Client,
        user_agent: &UserAgentConfig,
        crawler: &CrawlerConfig,
    ) -> Self {
        Self {
            client,
            robots_agent: user_agent.crawler_name.clone(),
            respect_robots: crawler.respect_robots,
            min_spacing: Duration::from_millis(crawler.minimum_time_between_requests),
            next_slot: Mutex::new(HashMap::new()),
            robots: Mutex::new(RobotsCache::new()),
        }
    }

    /// Builds the client and the fetcher from configuration
    pub fn from_config(
        user_agent: &UserAgentConfig,
        crawler: &CrawlerConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = build_http_client(user_agent)?;
        Ok(Self::new(client, user_agent, crawler))
    }

    /// Checks robots.txt, returning the host's crawl delay when allowed
    async fn check_robots(&self, url: &Url) -> Result<Option<Duration>, FetchError> {
        if !self.respect_robots {
            return Ok(None);
        }

        let origin = robots_origin(url);
        let cached = self.robots.lock().await.get(&origin).cloned();
        let robots = match cached {
            Some(robots) => robots,
            None => {
                let robots = fetch_robots(&self.client, url).await;
                self.robots.lock().await.insert(origin, robots.clone());
                robots
            }
        };

        if !robots.is_allowed(url.as_str(), &self.robots_agent) {
            return Err(FetchError::RobotsDenied {
                url: url.to_string(),
            });
        }

        Ok(robots.crawl_delay(&self.robots_agent))
    }

    /// Reserves the next request slot for the URL's host and waits for it
    async fn wait_for_slot(&self, url: &Url, crawl_delay: Option<Duration>) {
        let spacing = crawl_delay.map_or(self.min_spacing, |d| d.max(self.min_spacing));
        if spacing.is_zero() {
            return;
        }

        let host = crate::url::extract_domain(url).unwrap_or_default();
        let wake_at = {
            let mut slots = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = slots.get(&host).copied().map_or(now, |s| s.max(now));
            slots.insert(host, slot + spacing);
            slot
        };

        tokio::time::sleep_until(wake_at).await;
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let crawl_delay = self.check_robots(url).await?;
        self.wait_for_slot(url, crawl_delay).await;

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Connect {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        // Missing content types are given the benefit of the doubt.
        if !content_type.is_empty() && !content_type.contains("html") {
            return Err(FetchError::ContentMismatch {
                url: url.to_string(),
                content_type,
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        tracing::trace!("Fetched {} ({} bytes)", final_url, body.len());

        Ok(FetchedPage {
            final_url,
            status: status.as_u16(),
            body,
        })
    }
}
