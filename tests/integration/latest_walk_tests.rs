//! Integration tests for the incremental walk over the latest-updates
//! listing
//!
//! The mock listing is sorted newest first, like the real one, with dates
//! relative to today.

use chrono::{Duration as Days, NaiveDate, Utc};
use std::sync::Arc;
use tankobon::config::{CrawlerConfig, UserAgentConfig};
use tankobon::crawler::{Engine, EngineOptions, FetchRequest, HttpFetcher};
use tankobon::site::MangaHere;
use tankobon::Entity;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn engine_for(server: &MockServer) -> Engine {
    let crawler = CrawlerConfig {
        max_concurrent_fetches: 4,
        max_retries: 1,
        retry_base_delay: 10,
        max_fetches: 0,
        minimum_time_between_requests: 0,
        respect_robots: false,
    };
    let user_agent = UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    };

    let base = Url::parse(&server.uri()).expect("Failed to parse base URL");
    let adapter = MangaHere::with_base(base).expect("Failed to build adapter");
    let fetcher =
        HttpFetcher::from_config(&user_agent, &crawler).expect("Failed to build fetcher");

    Engine::new(
        Arc::new(adapter),
        Arc::new(fetcher),
        EngineOptions::from(&crawler),
    )
}

fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), "text/html")
}

fn days_ago(days: i64) -> NaiveDate {
    Utc::now().date_naive() - Days::days(days)
}

/// One listing page: `(series slug, days since its update)` per entry
fn listing_page(entries: &[(&str, i64)], next: Option<&str>) -> String {
    let rows: String = entries
        .iter()
        .map(|(slug, age)| {
            format!(
                r#"<dl><dt><a class="manga_info" href="/manga/{slug}/">{slug}</a>
                   <span class="time">{}</span></dt></dl>"#,
                days_ago(*age).format("%b %d, %Y")
            )
        })
        .collect();
    let next = next
        .map(|href| format!(r#"<a class="next" href="{href}">Next</a>"#))
        .unwrap_or_default();

    format!(r#"<html><body><div class="manga_updates">{rows}</div>{next}</body></html>"#)
}

fn series_page(slug: &str) -> String {
    format!(
        r#"<html><head><meta property="og:title" content="{slug}"></head><body>
        <div class="detail_list"><ul>
        <li><span class="left"><a href="/manga/{slug}/c001/">{slug} 1</a></span></li>
        </ul></div></body></html>"#
    )
}

async fn mount_listing(server: &MockServer, at: &str, body: String, times: u64) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(html(body))
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_series(server: &MockServer, slugs: &[&str]) {
    for slug in slugs {
        Mock::given(method("GET"))
            .and(path(format!("/manga/{slug}/")))
            .respond_with(html(series_page(slug)))
            .expect(1)
            .mount(server)
            .await;
    }
}

fn series_names(entities: &[Entity]) -> Vec<String> {
    let mut names: Vec<String> = entities
        .iter()
        .filter_map(|e| match e {
            Entity::Manga(m) => Some(m.name.clone()),
            _ => None,
        })
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_walk_stops_after_first_page_older_than_cutoff() {
    let server = MockServer::start().await;

    mount_listing(
        &server,
        "/latest/",
        listing_page(&[("a", 0), ("b", 2)], Some("/latest/2/")),
        1,
    )
    .await;
    mount_listing(
        &server,
        "/latest/2/",
        listing_page(&[("c", 5), ("a", 9)], Some("/latest/3/")),
        1,
    )
    .await;
    // Oldest entry is past the cutoff, but "d" is still newer and must be
    // crawled.
    mount_listing(
        &server,
        "/latest/3/",
        listing_page(&[("d", 8), ("e", 12)], Some("/latest/4/")),
        1,
    )
    .await;
    mount_listing(
        &server,
        "/latest/4/",
        listing_page(&[("f", 14)], None),
        0,
    )
    .await;
    mount_series(&server, &["a", "b", "c", "d", "e"]).await;

    let engine = engine_for(&server);
    let seed = FetchRequest::latest(engine.adapter().as_ref(), days_ago(10));
    let (entities, report) = engine.start(seed).collect().await.unwrap();

    assert_eq!(series_names(&entities), vec!["a", "b", "c", "d", "e"]);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.fetched, 8);
    assert_eq!(report.fetch_failures, 0);
}

#[tokio::test]
async fn test_walk_ends_on_last_listing_page() {
    let server = MockServer::start().await;

    mount_listing(
        &server,
        "/latest/",
        listing_page(&[("a", 0)], Some("/latest/2/")),
        1,
    )
    .await;
    mount_listing(&server, "/latest/2/", listing_page(&[("b", 1)], None), 1).await;
    mount_series(&server, &["a", "b"]).await;

    let engine = engine_for(&server);
    let seed = FetchRequest::latest(engine.adapter().as_ref(), days_ago(30));
    let (entities, _) = engine.start(seed).collect().await.unwrap();

    assert_eq!(series_names(&entities), vec!["a", "b"]);
}

#[tokio::test]
async fn test_undatable_page_ends_walk() {
    let server = MockServer::start().await;

    mount_listing(
        &server,
        "/latest/",
        r#"<html><body>
        <dl><dt><a class="manga_info" href="/manga/a/">a</a><span class="time">a while back</span></dt></dl>
        <a class="next" href="/latest/2/">Next</a>
        </body></html>"#
            .to_string(),
        1,
    )
    .await;
    mount_listing(&server, "/latest/2/", listing_page(&[("b", 0)], None), 0).await;
    mount_series(&server, &["a"]).await;

    let engine = engine_for(&server);
    let seed = FetchRequest::latest(engine.adapter().as_ref(), days_ago(10));
    let (entities, _) = engine.start(seed).collect().await.unwrap();

    assert_eq!(series_names(&entities), vec!["a"]);
}

#[tokio::test]
async fn test_relative_dates_count_from_fetch_day() {
    let server = MockServer::start().await;

    mount_listing(
        &server,
        "/latest/",
        r#"<html><body>
        <dl><dt><a class="manga_info" href="/manga/a/">a</a><span class="time">Today</span></dt></dl>
        <dl><dt><a class="manga_info" href="/manga/b/">b</a><span class="time">3 days ago</span></dt></dl>
        <a class="next" href="/latest/2/">Next</a>
        </body></html>"#
            .to_string(),
        1,
    )
    .await;
    mount_listing(&server, "/latest/2/", listing_page(&[("c", 1)], None), 0).await;
    mount_series(&server, &["a", "b"]).await;

    let engine = engine_for(&server);
    let seed = FetchRequest::latest(engine.adapter().as_ref(), days_ago(2));
    let (entities, _) = engine.start(seed).collect().await.unwrap();

    assert_eq!(series_names(&entities), vec!["a", "b"]);
}

#[tokio::test]
async fn test_out_of_range_relative_date_ends_walk() {
    let server = MockServer::start().await;

    mount_listing(
        &server,
        "/latest/",
        r#"<html><body>
        <dl><dt><a class="manga_info" href="/manga/a/">a</a><span class="time">100000000 days ago</span></dt></dl>
        <a class="next" href="/latest/2/">Next</a>
        </body></html>"#
            .to_string(),
        1,
    )
    .await;
    mount_listing(&server, "/latest/2/", listing_page(&[("b", 0)], None), 0).await;
    mount_series(&server, &["a"]).await;

    let engine = engine_for(&server);
    let seed = FetchRequest::latest(engine.adapter().as_ref(), days_ago(10));
    let (entities, report) = engine.start(seed).collect().await.unwrap();

    assert_eq!(series_names(&entities), vec!["a"]);
    assert_eq!(report.fetch_failures, 0);
}
