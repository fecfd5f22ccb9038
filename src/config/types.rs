use serde::Deserialize;

/// Main configuration structure for Tankobon
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawl engine and fetcher behavior
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of fetches in flight at once
    #[serde(rename = "max-concurrent-fetches")]
    pub max_concurrent_fetches: u32,

    /// Retries granted to a request after a transient failure
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Delay before the first retry (milliseconds), doubled per attempt
    #[serde(rename = "retry-base-delay")]
    pub retry_base_delay: u64,

    /// Fetch budget of one crawl invocation (0 = unlimited)
    #[serde(rename = "max-fetches", default)]
    pub max_fetches: u64,

    /// Minimum time between two requests to the same domain (milliseconds)
    #[serde(rename = "minimum-time-between-requests", default)]
    pub minimum_time_between_requests: u64,

    /// Whether the fetcher honors robots.txt
    #[serde(rename = "respect-robots", default = "default_true")]
    pub respect_robots: bool,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the JSON-lines entity file ("-" writes to stdout)
    #[serde(rename = "entities-path")]
    pub entities_path: String,
}

fn default_true() -> bool {
    true
}
