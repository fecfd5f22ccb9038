//! Statistics gathered over one crawl invocation
//!
//! The engine owns a `CrawlReport` for the lifetime of a crawl and hands
//! it back when the crawl ends.

use crate::model::Entity;
use std::collections::BTreeMap;
use std::time::Duration;

/// Counters of one crawl invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlReport {
    /// Fetches dispatched to the fetcher (retries not included)
    pub dispatched: u64,

    /// Fetches that produced a document
    pub fetched: u64,

    /// Extra attempts spent on transient failures
    pub retries: u64,

    /// Fetches dropped after a permanent failure or exhausted retries
    pub fetch_failures: u64,

    /// Documents that held no content (soft-404, licensed, no issues)
    pub structural_skips: u64,

    /// Entities or parts of entities rejected by the builder
    pub validation_failures: u64,

    /// Fetch branches ended by an adapter contract violation
    pub contract_violations: u64,

    /// Requests rejected for leaving the adapter's domains
    pub off_domain: u64,

    /// Requests already seen in this invocation
    pub duplicates: u64,

    /// Requests dropped because the fetch budget was spent
    pub budget_dropped: u64,

    /// Requests dropped because the crawl was cancelled
    pub cancelled_dropped: u64,

    /// Buffered issue pages thrown away by a cancellation
    pub discarded_pages: u64,

    /// Emitted entities by kind
    pub entities: BTreeMap<&'static str, u64>,

    pub cancelled: bool,
    pub budget_exhausted: bool,
    pub elapsed: Duration,
}

impl CrawlReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_entity(&mut self, entity: &Entity) {
        *self.entities.entry(entity.kind()).or_insert(0) += 1;
    }

    /// Emitted entities of one kind
    pub fn entities_of(&self, kind: &str) -> u64 {
        self.entities.get(kind).copied().unwrap_or(0)
    }

    pub fn total_entities(&self) -> u64 {
        self.entities.values().sum()
    }

    /// Requests that never reached a parse callback
    pub fn total_dropped(&self) -> u64 {
        self.fetch_failures
            + self.off_domain
            + self.duplicates
            + self.budget_dropped
            + self.cancelled_dropped
    }
}

/// Prints a report to stdout in a formatted manner
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");

    println!("Fetching:");
    println!("  Dispatched: {}", report.dispatched);
    println!("  Fetched: {}", report.fetched);
    println!("  Retries: {}", report.retries);
    println!("  Failed: {}", report.fetch_failures);
    println!();

    println!("Entities ({}):", report.total_entities());
    for (kind, count) in &report.entities {
        println!("  {}: {}", kind, count);
    }
    println!();

    println!("Dropped:");
    println!("  Structural skips: {}", report.structural_skips);
    println!("  Validation failures: {}", report.validation_failures);
    println!("  Contract violations: {}", report.contract_violations);
    println!("  Off-domain requests: {}", report.off_domain);
    println!("  Duplicate requests: {}", report.duplicates);
    if report.budget_exhausted {
        println!("  Over fetch budget: {}", report.budget_dropped);
    }
    if report.cancelled {
        println!("  Cancelled requests: {}", report.cancelled_dropped);
        println!("  Discarded pages: {}", report.discarded_pages);
    }
    println!();

    let status = match (report.cancelled, report.budget_exhausted) {
        (true, _) => "cancelled",
        (false, true) => "fetch budget exhausted",
        (false, false) => "complete",
    };
    println!(
        "Status: {} in {:.1}s",
        status,
        report.elapsed.as_secs_f64()
    );
}
