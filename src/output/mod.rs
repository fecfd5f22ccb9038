//! Output module for the entity stream
//!
//! This module handles:
//! - The `EntitySink` interface downstream consumers implement
//! - Writing entities as JSON lines
//! - An in-memory catalog that upserts series by URL
//! - The per-crawl report

mod catalog;
mod jsonl;
pub mod stats;
mod traits;

pub use catalog::MangaCatalog;
pub use jsonl::JsonLinesSink;
pub use stats::{print_report, CrawlReport};
pub use traits::{EntitySink, SinkError, SinkResult};
