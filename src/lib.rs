//! Tankobon: a manga catalog crawler
//!
//! This crate drives per-site adapters through the extraction phases of a
//! manga hosting website (genres, catalog, latest updates, series detail,
//! issue pages, page images) and produces a stream of validated entities
//! for downstream storage.

pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod robots;
pub mod site;
pub mod url;

use thiserror::Error;

/// Main error type for Tankobon operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Sink(#[from] output::SinkError),

    #[error("No adapter registered for site '{0}'")]
    UnknownSite(String),

    #[error("Crawl task failed: {0}")]
    Task(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Tankobon operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CancelMode, CrawlHandle, Engine, EngineOptions, FetchRequest, Phase};
pub use model::{Entity, Genres, Issue, IssuePage, Manga, RankOrder, ReadingDirection};
pub use site::SiteAdapter;
