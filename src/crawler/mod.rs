//! Crawler module for fetching and processing site documents
//!
//! This module contains the core crawling logic, including:
//! - Fetch requests, their phases and the context they carry
//! - HTTP fetching with politeness and error classification
//! - The engine that schedules fetches and routes documents to adapters
//! - The incremental walk over a site's latest-updates listing
//! - Validation and page ordering of emitted entities

mod builder;
mod context;
mod document;
mod engine;
mod fetcher;
mod latest;
mod request;

pub use builder::{BuildOutcome, EntityBuilder, ValidationError};
pub use context::{ContractViolation, CrawlContext};
pub use document::Document;
pub use engine::{
    dispatch, CancelMode, Canceller, CrawlHandle, Engine, EngineOptions, ParseOutput,
};
pub use fetcher::{
    build_http_client, user_agent_string, FetchError, FetchedPage, Fetcher, HttpFetcher,
};
pub use latest::{oldest_on_page, LatestListing, LatestWalk, WalkState};
pub use request::{FetchRequest, Phase};

use crate::output::{CrawlReport, EntitySink};
use crate::CrawlError;

/// Runs a crawl to completion, handing every entity to a sink
///
/// The sink is finished once the stream ends. A sink error abandons the
/// crawl.
///
/// # Arguments
///
/// * `handle` - A started crawl invocation
/// * `sink` - Receives entities in emission order
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The crawl ended and the sink was finished
/// * `Err(CrawlError)` - The sink failed or the driver task died
pub async fn drain_to_sink(
    mut handle: CrawlHandle,
    sink: &mut dyn EntitySink,
) -> Result<CrawlReport, CrawlError> {
    while let Some(entity) = handle.next().await {
        if let Err(e) = sink.accept(&entity) {
            tracing::error!("Sink rejected {}: {}", entity.kind(), e);
            handle.cancel(CancelMode::Abandon);
            handle.finish().await?;
            return Err(e.into());
        }
    }

    let report = handle.finish().await?;
    sink.finish()?;
    Ok(report)
}
