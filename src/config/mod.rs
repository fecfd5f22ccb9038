//! Configuration module for Tankobon
//!
//! A config file has three tables: `[crawler]` tunes the engine and the
//! fetcher's politeness, `[user-agent]` identifies the crawler to sites and
//! `[output]` names where entities are written. Files are validated on load.
//!
//! # Example
//!
//! ```no_run
//! use tankobon::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("tankobon.toml")).unwrap();
//! println!("Fan-out: {}", config.crawler.max_concurrent_fetches);
//! ```

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use types::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
