//! Tankobon main entry point
//!
//! This is the command-line interface for the Tankobon manga crawler.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tankobon::config::{load_config_with_hash, Config};
use tankobon::crawler::{drain_to_sink, CancelMode, Engine, EngineOptions, FetchRequest, HttpFetcher};
use tankobon::output::{print_report, JsonLinesSink};
use tankobon::site::{adapter_for, available_sites, SiteAdapter};
use tankobon::url::parse_http_url;
use tankobon::{Issue, Manga};
use tracing_subscriber::EnvFilter;

/// Tankobon: a polite manga catalog crawler
///
/// Tankobon walks a manga site through its genres, catalog, latest updates,
/// series and issue pages, and writes the validated entities it finds as
/// JSON lines.
#[derive(Parser, Debug)]
#[command(name = "tankobon")]
#[command(version)]
#[command(about = "A polite manga catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG", required_unless_present = "list_sites")]
    config: Option<PathBuf>,

    /// Site adapter to crawl with
    #[arg(long, default_value = "mangahere")]
    site: String,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// List the available site adapters and exit
    #[arg(long)]
    list_sites: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the genre list
    Genres,

    /// Crawl the full catalog and every series in it
    Catalog,

    /// Walk the latest-updates listing back to a cutoff date
    Latest {
        /// Oldest update date to walk back to (YYYY-MM-DD), default today
        #[arg(long, value_parser = parse_date)]
        until: Option<NaiveDate>,
    },

    /// Crawl one series detail page
    Collection {
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Crawl every page of one issue
    Issue {
        #[arg(value_name = "MANGA_URL")]
        manga_url: String,

        #[arg(value_name = "ISSUE_URL")]
        issue_url: String,
    },
}

fn parse_date(text: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|e| format!("{}: {}", text, e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_sites {
        for site in available_sites() {
            println!("{}", site);
        }
        return Ok(());
    }

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let Some(config_path) = cli.config.as_ref() else {
        anyhow::bail!("a configuration file is required");
    };

    tracing::info!("Loading configuration from: {}", config_path.display());
    let (config, hash) = load_config_with_hash(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let adapter = adapter_for(&cli.site)?;
    let Some(command) = cli.command.as_ref() else {
        anyhow::bail!("no crawl command given (try --help)");
    };
    let seed = seed_request(adapter.as_ref(), command)?;

    if cli.dry_run {
        handle_dry_run(&config, adapter.as_ref(), &seed);
        return Ok(());
    }

    handle_crawl(config, adapter, seed).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tankobon=info,warn"),
            1 => EnvFilter::new("tankobon=debug,info"),
            2 => EnvFilter::new("tankobon=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Entities may go to stdout, so logs stay on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Builds the seed request of a crawl command
fn seed_request(adapter: &dyn SiteAdapter, command: &Command) -> Result<FetchRequest> {
    let seed = match command {
        Command::Genres => FetchRequest::genres(adapter),
        Command::Catalog => FetchRequest::catalog(adapter),
        Command::Latest { until } => {
            let until = until.unwrap_or_else(|| Utc::now().date_naive());
            FetchRequest::latest(adapter, until)
        }
        Command::Collection { url } => FetchRequest::collection(parse_http_url(url)?),
        Command::Issue {
            manga_url,
            issue_url,
        } => {
            let manga_url = parse_http_url(manga_url)?.to_string();
            let issue_url = parse_http_url(issue_url)?.to_string();
            let manga = Arc::new(Manga::with_url(manga_url.clone()));
            let issue = Arc::new(Issue::new(manga_url, issue_url));
            FetchRequest::issue(manga, issue)?
        }
    };

    if !adapter.allows(&seed.url) {
        anyhow::bail!("{} is outside the domains of {}", seed.url, adapter.name());
    }

    Ok(seed)
}

/// Handles the --dry-run mode: shows the configuration and the seed request
fn handle_dry_run(config: &Config, adapter: &dyn SiteAdapter, seed: &FetchRequest) {
    println!("=== Tankobon Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  Retry base delay: {}ms", config.crawler.retry_base_delay);
    match config.crawler.max_fetches {
        0 => println!("  Fetch budget: unlimited"),
        n => println!("  Fetch budget: {}", n),
    }
    println!(
        "  Minimum time between requests: {}ms",
        config.crawler.minimum_time_between_requests
    );
    println!("  Respect robots.txt: {}", config.crawler.respect_robots);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Entities: {}", config.output.entities_path);

    println!("\nSite: {}", adapter.name());
    println!("  Allowed domains: {}", adapter.allowed_domains().join(", "));
    println!("  Seed: {} ({})", seed.url, seed.phase);
    if let Some(until) = seed.context.until() {
        println!("  Until: {}", until);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    adapter: Arc<dyn SiteAdapter>,
    seed: FetchRequest,
) -> Result<()> {
    let fetcher = HttpFetcher::from_config(&config.user_agent, &config.crawler)
        .context("failed to build HTTP client")?;
    let mut sink = JsonLinesSink::open(&config.output.entities_path)
        .with_context(|| format!("failed to open {}", config.output.entities_path))?;

    let engine = Engine::new(
        adapter,
        Arc::new(fetcher),
        EngineOptions::from(&config.crawler),
    );

    tracing::info!("Seed: {} ({})", seed.url, seed.phase);
    let handle = engine.start(seed);

    let canceller = handle.canceller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, finishing in-flight fetches");
            canceller.cancel(CancelMode::Drain);
        }
    });

    let report = match drain_to_sink(handle, &mut sink).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e).context("crawl failed");
        }
    };

    tracing::info!(
        "Wrote {} entities to {}",
        sink.written(),
        config.output.entities_path
    );
    print_report(&report);

    Ok(())
}
