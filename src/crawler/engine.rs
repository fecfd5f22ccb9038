//! Crawl engine - drives a site adapter over a work queue
//!
//! One `start` call is one crawl invocation. A driver task owns all of the
//! invocation's state (seen set, frontier, entity builder, report) and
//! spawns fetches up to the fan-out limit. Parsing runs on the driver
//! between fetches, so adapters never run concurrently with each other.
//!
//! # Request flow
//!
//! 1. `enqueue`: domain filter, stop check, dedup on (phase, URL)
//! 2. dispatch: fetch budget, fan-out permit, fetch with retry
//! 3. completion: parse the document in the request's phase, build
//!    entities, enqueue follow-ups

use crate::config::CrawlerConfig;
use crate::crawler::builder::{BuildOutcome, EntityBuilder};
use crate::crawler::{ContractViolation, Document, FetchError, FetchRequest, FetchedPage, Fetcher, Phase};
use crate::model::Entity;
use crate::output::CrawlReport;
use crate::site::SiteAdapter;
use crate::url::dedup_key;
use crate::CrawlError;
use chrono::Utc;
use std::any::Any;
use std::collections::{HashSet, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::Instant;

/// What happens to in-flight fetches when a crawl is cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelMode {
    /// Stop dispatching; let in-flight fetches finish and emit their entities
    Drain,
    /// Stop dispatching and abort in-flight fetches
    Abandon,
}

/// Tuning knobs of the engine
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub max_concurrent_fetches: usize,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    /// `None` for an unlimited fetch budget
    pub max_fetches: Option<u64>,
    /// Entities buffered between the driver and the consumer
    pub channel_capacity: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 8,
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
            max_fetches: None,
            channel_capacity: 64,
        }
    }
}

impl From<&CrawlerConfig> for EngineOptions {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            max_concurrent_fetches: config.max_concurrent_fetches.max(1) as usize,
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay),
            max_fetches: (config.max_fetches > 0).then_some(config.max_fetches),
            ..Self::default()
        }
    }
}

/// Result of routing one document to its phase callback
#[derive(Debug, Default)]
pub struct ParseOutput {
    pub entities: Vec<Entity>,
    pub requests: Vec<FetchRequest>,
    /// The document was a valid "no content" outcome
    pub skipped: bool,
}

/// Routes a document to the adapter callback named by the request's phase
///
/// # Returns
///
/// * `Ok(ParseOutput)` - Entities and follow-up requests of the document
/// * `Err(ContractViolation)` - The request lacks context its phase needs
pub fn dispatch(
    adapter: &dyn SiteAdapter,
    doc: &Document,
    request: &FetchRequest,
) -> Result<ParseOutput, ContractViolation> {
    let context = &request.context;
    let mut output = ParseOutput::default();

    match request.phase {
        Phase::Genres => output
            .entities
            .push(Entity::Genres(adapter.parse_genres(doc))),
        Phase::Catalog => output.requests = adapter.parse_catalog(doc),
        Phase::Latest => {
            let until = context.until().unwrap_or_else(|| doc.fetched_on());
            output.requests = adapter.parse_latest(doc, until);
        }
        Phase::Collection => {
            let partial = context.manga().map(|m| m.as_ref());
            match adapter.parse_collection(doc, partial) {
                Some(manga) => output.entities.push(Entity::Manga(manga)),
                None => output.skipped = true,
            }
        }
        Phase::Issue => {
            let manga = context.require_manga(Phase::Issue)?;
            let issue = context.require_issue(Phase::Issue)?;
            output.requests = adapter.parse_manga(doc, manga, issue);
        }
        Phase::Page => {
            let manga = context.require_manga(Phase::Page)?;
            let issue = context.require_issue(Phase::Page)?;
            let number = context.require_number(Phase::Page)?;
            output
                .entities
                .push(Entity::IssuePage(adapter.parse_page(doc, manga, issue, number)));
        }
    }

    Ok(output)
}

/// Crawl engine bound to one site adapter and one fetcher
#[derive(Clone)]
pub struct Engine {
    adapter: Arc<dyn SiteAdapter>,
    fetcher: Arc<dyn Fetcher>,
    options: EngineOptions,
}

impl Engine {
    pub fn new(
        adapter: Arc<dyn SiteAdapter>,
        fetcher: Arc<dyn Fetcher>,
        options: EngineOptions,
    ) -> Self {
        Self {
            adapter,
            fetcher,
            options,
        }
    }

    pub fn adapter(&self) -> &Arc<dyn SiteAdapter> {
        &self.adapter
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Starts a crawl invocation from one seed request
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, seed: FetchRequest) -> CrawlHandle {
        self.start_many([seed])
    }

    /// Starts a crawl invocation from several seed requests
    pub fn start_many(&self, seeds: impl IntoIterator<Item = FetchRequest>) -> CrawlHandle {
        let (entity_tx, entity_rx) = mpsc::channel(self.options.channel_capacity.max(1));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = watch::channel(None);

        let mut invocation = Invocation::new(self.clone(), entity_tx);
        for seed in seeds {
            invocation.enqueue(seed);
        }

        tracing::info!(
            "Starting {} crawl with {} seed(s)",
            self.adapter.name(),
            invocation.frontier.len()
        );

        let driver = tokio::spawn(invocation.run(command_rx, cancel_rx));

        CrawlHandle {
            entities: entity_rx,
            commands: command_tx,
            cancel: Canceller(Arc::new(cancel_tx)),
            driver,
        }
    }
}

/// Requests cancellation of a running crawl; cheap to clone
#[derive(Debug, Clone)]
pub struct Canceller(Arc<watch::Sender<Option<CancelMode>>>);

impl Canceller {
    pub fn cancel(&self, mode: CancelMode) {
        // Abandon overrides an earlier Drain, never the other way around.
        self.0.send_if_modified(|current| match (*current, mode) {
            (Some(CancelMode::Abandon), _) | (Some(CancelMode::Drain), CancelMode::Drain) => false,
            _ => {
                *current = Some(mode);
                true
            }
        });
    }
}

/// Consumer side of a crawl invocation: the entity stream and its controls
pub struct CrawlHandle {
    entities: mpsc::Receiver<Entity>,
    commands: mpsc::UnboundedSender<FetchRequest>,
    cancel: Canceller,
    driver: JoinHandle<CrawlReport>,
}

impl CrawlHandle {
    /// Next validated entity, `None` once the crawl has ended
    pub async fn next(&mut self) -> Option<Entity> {
        self.entities.recv().await
    }

    /// Adds a request to the running invocation
    ///
    /// Returns false if the invocation has already ended.
    pub fn enqueue(&self, request: FetchRequest) -> bool {
        self.commands.send(request).is_ok()
    }

    pub fn cancel(&self, mode: CancelMode) {
        self.cancel.cancel(mode);
    }

    /// A cancellation handle that outlives borrows of this one
    pub fn canceller(&self) -> Canceller {
        self.cancel.clone()
    }

    /// Drains the stream and returns every entity with the final report
    pub async fn collect(mut self) -> Result<(Vec<Entity>, CrawlReport), CrawlError> {
        let mut entities = Vec::new();
        while let Some(entity) = self.next().await {
            entities.push(entity);
        }
        let report = self.finish().await?;
        Ok((entities, report))
    }

    /// Waits for the crawl to end and returns its report
    ///
    /// Entities not yet received are discarded.
    pub async fn finish(self) -> Result<CrawlReport, CrawlError> {
        drop(self.entities);
        drop(self.commands);
        self.driver
            .await
            .map_err(|e| CrawlError::Task(e.to_string()))
    }
}

/// A finished fetch task
struct Completed {
    request: FetchRequest,
    result: Result<FetchedPage, FetchError>,
    retries: u32,
}

/// State of one crawl invocation, owned by its driver task
struct Invocation {
    engine: Engine,
    seen: HashSet<(Phase, String)>,
    frontier: VecDeque<FetchRequest>,
    in_flight: JoinSet<Completed>,
    fanout: Arc<Semaphore>,
    builder: EntityBuilder,
    report: CrawlReport,
    entities: mpsc::Sender<Entity>,
    stop: Option<StopReason>,
    started: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Budget,
    Cancelled(CancelMode),
}

impl Invocation {
    fn new(engine: Engine, entities: mpsc::Sender<Entity>) -> Self {
        let fanout = Arc::new(Semaphore::new(engine.options.max_concurrent_fetches.max(1)));
        Self {
            engine,
            seen: HashSet::new(),
            frontier: VecDeque::new(),
            in_flight: JoinSet::new(),
            fanout,
            builder: EntityBuilder::new(),
            report: CrawlReport::new(),
            entities,
            stop: None,
            started: Instant::now(),
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<FetchRequest>,
        mut cancel: watch::Receiver<Option<CancelMode>>,
    ) -> CrawlReport {
        let mut cancel_open = true;

        loop {
            while let Ok(request) = commands.try_recv() {
                self.enqueue(request);
            }

            let outcome = self.dispatch_ready();
            if !self.deliver(outcome).await {
                break;
            }

            if self.in_flight.is_empty() {
                break;
            }

            tokio::select! {
                Some(joined) = self.in_flight.join_next() => {
                    if !self.complete(joined).await {
                        break;
                    }
                }
                changed = cancel.changed(), if cancel_open => {
                    match changed {
                        Ok(()) => {
                            let mode = *cancel.borrow_and_update();
                            if let Some(mode) = mode {
                                self.cancel(mode);
                                if mode == CancelMode::Abandon {
                                    break;
                                }
                            }
                        }
                        Err(_) => cancel_open = false,
                    }
                }
                Some(request) = commands.recv() => {
                    self.enqueue(request);
                }
                else => break,
            }
        }

        self.close().await
    }

    /// Accepts a request into the frontier
    fn enqueue(&mut self, request: FetchRequest) -> bool {
        let adapter = &self.engine.adapter;
        if !adapter.allows(&request.url) {
            let violation = ContractViolation::OffDomain {
                url: request.url.to_string(),
                site: adapter.name().to_string(),
            };
            tracing::warn!("Dropping {} request: {}", request.phase, violation);
            self.report.off_domain += 1;
            return false;
        }

        if let Some(reason) = self.stop {
            self.count_stopped(reason, 1);
            return false;
        }

        let key = (request.phase, dedup_key(&request.url));
        if !self.seen.insert(key) {
            tracing::debug!("Already seen {} ({})", request.url, request.phase);
            self.report.duplicates += 1;
            return false;
        }

        tracing::debug!("Queued {} ({})", request.url, request.phase);
        self.frontier.push_back(request);
        true
    }

    /// Spawns fetches while permits, budget and queued requests allow
    fn dispatch_ready(&mut self) -> BuildOutcome {
        while self.stop.is_none() && !self.frontier.is_empty() {
            if let Some(max) = self.engine.options.max_fetches {
                if self.report.dispatched >= max {
                    tracing::info!("Fetch budget of {} spent", max);
                    self.report.budget_exhausted = true;
                    return self.halt(StopReason::Budget);
                }
            }

            let Ok(permit) = self.fanout.clone().try_acquire_owned() else {
                break;
            };
            let Some(request) = self.frontier.pop_front() else {
                break;
            };

            self.report.dispatched += 1;
            self.spawn_fetch(request, permit);
        }

        BuildOutcome::default()
    }

    fn spawn_fetch(&mut self, request: FetchRequest, permit: OwnedSemaphorePermit) {
        let fetcher = self.engine.fetcher.clone();
        let max_retries = self.engine.options.max_retries;
        let base_delay = self.engine.options.retry_base_delay;

        tracing::debug!("Fetching {} ({})", request.url, request.phase);

        self.in_flight.spawn(async move {
            let _permit = permit;
            let (result, retries) =
                fetch_with_retry(fetcher.as_ref(), &request, max_retries, base_delay).await;
            Completed {
                request,
                result,
                retries,
            }
        });
    }

    /// Handles a finished fetch; false if the consumer went away
    async fn complete(&mut self, joined: Result<Completed, JoinError>) -> bool {
        let Completed {
            request,
            result,
            retries,
        } = match joined {
            Ok(completed) => completed,
            Err(e) => {
                tracing::error!("Fetch task failed: {}", e);
                self.report.fetch_failures += 1;
                return true;
            }
        };
        self.report.retries += u64::from(retries);

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Dropping {} request: {}", request.phase, e);
                self.report.fetch_failures += 1;
                let outcome = self.lose_page(&request);
                return self.deliver(outcome).await;
            }
        };
        self.report.fetched += 1;
        tracing::trace!("Fetched {} (HTTP {})", page.final_url, page.status);

        // The parsed document is not Send; it must be gone before the next await.
        let adapter = self.engine.adapter.as_ref();
        let parsed = panic::catch_unwind(AssertUnwindSafe(|| {
            let doc = Document::parse(page.final_url, &page.body, Utc::now().date_naive());
            dispatch(adapter, &doc, &request)
        }));

        let output = match parsed {
            Ok(Ok(output)) => output,
            Err(payload) => {
                tracing::warn!(
                    "Adapter panicked at {} ({}): {}",
                    request.url,
                    request.phase,
                    panic_message(payload.as_ref())
                );
                self.report.contract_violations += 1;
                let outcome = self.lose_page(&request);
                return self.deliver(outcome).await;
            }
            Ok(Err(violation)) => {
                tracing::warn!(
                    "Contract violation at {} ({}): {}",
                    request.url,
                    request.phase,
                    violation
                );
                self.report.contract_violations += 1;
                return true;
            }
        };

        if output.skipped {
            tracing::trace!("No content at {} ({})", request.url, request.phase);
            self.report.structural_skips += 1;
        }

        let mut pages_accepted = 0;
        for follow_up in output.requests {
            let is_page = follow_up.phase == Phase::Page;
            if self.enqueue(follow_up) && is_page {
                pages_accepted += 1;
            }
        }

        if request.phase == Phase::Issue {
            if let (Some(manga), Some(issue)) = (request.context.manga(), request.context.issue()) {
                tracing::debug!("{} has {} page(s)", issue.url, pages_accepted);
                self.builder.expect_pages(&manga.url, &issue.url, pages_accepted);
            }
        }

        let mut outcome = BuildOutcome::default();
        for entity in output.entities {
            let built = self.builder.build(entity);
            outcome.ready.extend(built.ready);
            outcome.failures.extend(built.failures);
        }

        for failure in &outcome.failures {
            tracing::warn!(
                "Validation failure at {} ({}): {}",
                request.url,
                request.phase,
                failure
            );
        }

        self.deliver(outcome).await
    }

    /// Tells the builder that a page request will never produce its page
    fn lose_page(&mut self, request: &FetchRequest) -> BuildOutcome {
        let context = &request.context;
        match (request.phase, context.manga(), context.issue(), context.number()) {
            (Phase::Page, Some(manga), Some(issue), Some(number)) => {
                self.builder.page_lost(&manga.url, &issue.url, number)
            }
            _ => BuildOutcome::default(),
        }
    }

    /// Stops dispatching and empties the frontier
    fn halt(&mut self, reason: StopReason) -> BuildOutcome {
        self.stop = Some(reason);

        let queued: Vec<FetchRequest> = self.frontier.drain(..).collect();
        self.count_stopped(reason, queued.len() as u64);

        let mut outcome = BuildOutcome::default();
        if reason == StopReason::Budget {
            for request in &queued {
                let lost = self.lose_page(request);
                outcome.ready.extend(lost.ready);
                outcome.failures.extend(lost.failures);
            }
        }
        outcome
    }

    fn count_stopped(&mut self, reason: StopReason, count: u64) {
        match reason {
            StopReason::Budget => self.report.budget_dropped += count,
            StopReason::Cancelled(_) => self.report.cancelled_dropped += count,
        }
    }

    fn cancel(&mut self, mode: CancelMode) {
        tracing::info!("Crawl cancelled ({:?})", mode);
        self.report.cancelled = true;

        if let Some(StopReason::Cancelled(CancelMode::Abandon)) = self.stop {
            return;
        }

        // Anything queued is dropped; a budget stop already emptied the frontier.
        let _ = self.halt(StopReason::Cancelled(mode));

        if mode == CancelMode::Abandon {
            self.report.cancelled_dropped += self.in_flight.len() as u64;
            self.in_flight.abort_all();
        }
    }

    /// Sends ready entities to the consumer; false if it went away
    async fn deliver(&mut self, outcome: BuildOutcome) -> bool {
        self.report.validation_failures += outcome.failures.len() as u64;

        for entity in outcome.ready {
            self.report.record_entity(&entity);
            if self.entities.send(entity).await.is_err() {
                tracing::info!("Entity consumer went away, abandoning crawl");
                self.cancel(CancelMode::Abandon);
                return false;
            }
        }
        true
    }

    async fn close(mut self) -> CrawlReport {
        if self.report.cancelled {
            let dropped = self.builder.discard();
            if dropped > 0 {
                tracing::info!("Discarded {} page(s) of incomplete issues", dropped);
            }
            self.report.discarded_pages += dropped as u64;
        } else {
            let outcome = self.builder.finish();
            for failure in &outcome.failures {
                tracing::warn!("Validation failure at end of crawl: {}", failure);
            }
            self.deliver(outcome).await;
        }

        self.in_flight.shutdown().await;
        self.report.elapsed = self.started.elapsed();

        tracing::info!(
            "Crawl finished: {} fetched, {} entities, {} failed, {} dropped",
            self.report.fetched,
            self.report.total_entities(),
            self.report.fetch_failures,
            self.report.total_dropped()
        );

        self.report
    }
}

/// Text of a caught panic payload
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text
    } else {
        "non-string panic payload"
    }
}

/// Fetches with exponential backoff on transient failures
///
/// The n-th retry waits `base_delay * 2^(n-1)`.
async fn fetch_with_retry(
    fetcher: &dyn Fetcher,
    request: &FetchRequest,
    max_retries: u32,
    base_delay: Duration,
) -> (Result<FetchedPage, FetchError>, u32) {
    let mut attempt = 0;

    loop {
        match fetcher.fetch(&request.url).await {
            Ok(page) => return (Ok(page), attempt),
            Err(e) if e.is_transient() && attempt < max_retries => {
                let delay = base_delay.saturating_mul(2u32.saturating_pow(attempt));
                tracing::debug!(
                    "Retrying {} ({}) in {:?}: {}",
                    request.url,
                    request.phase,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return (Err(e), attempt),
        }
    }
}
