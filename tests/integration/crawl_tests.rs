//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small MangaHere-shaped site and run
//! the engine end-to-end over real HTTP.

use std::sync::Arc;
use std::time::Duration;
use tankobon::config::{CrawlerConfig, UserAgentConfig};
use tankobon::crawler::{drain_to_sink, Engine, EngineOptions, FetchRequest, HttpFetcher};
use tankobon::output::{JsonLinesSink, MangaCatalog};
use tankobon::site::MangaHere;
use tankobon::{Entity, Issue, Manga};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn crawler_config(respect_robots: bool) -> CrawlerConfig {
    CrawlerConfig {
        max_concurrent_fetches: 4,
        max_retries: 2,
        retry_base_delay: 10, // Very short for testing
        max_fetches: 0,
        minimum_time_between_requests: 0,
        respect_robots,
    }
}

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

/// Engine whose adapter is rooted at the mock server
fn engine_for(server: &MockServer, respect_robots: bool) -> Engine {
    let base = Url::parse(&server.uri()).expect("Failed to parse base URL");
    let adapter = MangaHere::with_base(base).expect("Failed to build adapter");
    let crawler = crawler_config(respect_robots);
    let fetcher =
        HttpFetcher::from_config(&user_agent(), &crawler).expect("Failed to build fetcher");

    Engine::new(
        Arc::new(adapter),
        Arc::new(fetcher),
        EngineOptions::from(&crawler),
    )
}

fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), "text/html")
}

async fn mount_html(server: &MockServer, at: &str, body: impl Into<String>) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(html(body))
        .mount(server)
        .await;
}

/// Series detail page with issues listed newest first
fn series_page(title: &str, slug: &str, issues: &[u32]) -> String {
    let rows: String = issues
        .iter()
        .map(|n| {
            format!(
                r#"<li><span class="left"><a href="/manga/{slug}/c{n:03}/">{title} {n}</a>
                   <span class="mr6">Vol 01</span></span>
                   <span class="right">Jan 5, 2024</span></li>"#
            )
        })
        .collect();

    format!(
        r#"<html><head><meta property="og:title" content="{title}"></head><body>
        <div class="manga_detail"><ul class="detail_topText">
          <li><label>Author(s):</label><a href="/author/x/">Someone</a></li>
          <li><label>Genre(s):</label>Action, Comedy</li>
          <li><label>Status:</label>Ongoing</li>
        </ul></div>
        <div class="detail_list"><ul>{rows}</ul></div>
        </body></html>"#
    )
}

fn issue_page(slug: &str, pages: u32) -> String {
    let options: String = (1..=pages)
        .map(|n| format!(r#"<option value="/manga/{slug}/c001/{n}.html">{n}</option>"#))
        .collect();
    format!(r#"<html><body><select class="wid60">{options}</select></body></html>"#)
}

fn image_page(base: &str, n: u32) -> String {
    format!(r#"<html><body><img id="image" src="{base}/store/{n}.jpg"></body></html>"#)
}

fn manga_of(entities: &[Entity]) -> Vec<&Manga> {
    entities
        .iter()
        .filter_map(|e| match e {
            Entity::Manga(m) => Some(m),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_genres_crawl() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/advsearch.htm",
        r#"<html><body>
        <a class="either">Action</a>
        <a class="either"> Comedy </a>
        <a class="either">Action</a>
        <a class="either">  </a>
        </body></html>"#,
    )
    .await;

    let engine = engine_for(&server, false);
    let seed = FetchRequest::genres(engine.adapter().as_ref());
    let (entities, report) = engine.start(seed).collect().await.unwrap();

    assert_eq!(entities.len(), 1);
    match &entities[0] {
        Entity::Genres(genres) => assert_eq!(genres.names, vec!["Action", "Comedy"]),
        other => panic!("Expected genres, got {:?}", other),
    }
    assert_eq!(report.fetched, 1);
}

#[tokio::test]
async fn test_catalog_crawl_fetches_each_series_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(
        &server,
        "/mangalist/",
        format!(
            r#"<html><body>
            <a class="manga_info" href="/manga/alpha/">Alpha</a>
            <a class="manga_info" href="{base}/manga/beta/">Beta</a>
            <a class="manga_info" href="/manga/alpha">Alpha again</a>
            <a class="manga_info" href="http://elsewhere.example.com/manga/gamma/">Gamma</a>
            </body></html>"#
        ),
    )
    .await;

    for (slug, title) in [("alpha", "Alpha"), ("beta", "Beta")] {
        Mock::given(method("GET"))
            .and(path(format!("/manga/{slug}/")))
            .respond_with(html(series_page(title, slug, &[3, 2, 1])))
            .expect(1)
            .mount(&server)
            .await;
    }

    let engine = engine_for(&server, false);
    let seed = FetchRequest::catalog(engine.adapter().as_ref());
    let (entities, report) = engine.start(seed).collect().await.unwrap();

    let mut names: Vec<&str> = manga_of(&entities)
        .into_iter()
        .map(|m| m.name.as_str())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Alpha", "Beta"]);
    assert_eq!(report.off_domain, 1);
    assert_eq!(report.duplicates, 1);

    let alpha = manga_of(&entities)
        .into_iter()
        .find(|m| m.name == "Alpha")
        .unwrap();
    assert_eq!(alpha.author, vec!["Someone"]);
    assert!(alpha.genres.contains("Comedy"));
    let orders: Vec<u32> = alpha.issues.iter().map(|i| i.order).collect();
    assert_eq!(orders, vec![3, 2, 1]);
    assert!(alpha.issues.iter().all(|i| i.manga_url == alpha.url));
}

#[tokio::test]
async fn test_soft_404_yields_nothing() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/manga/gone/",
        r#"<html><body><div class="error_404">Sorry, not found</div></body></html>"#,
    )
    .await;

    let engine = engine_for(&server, false);
    let url = Url::parse(&format!("{}/manga/gone/", server.uri())).unwrap();
    let (entities, report) = engine
        .start(FetchRequest::collection(url))
        .collect()
        .await
        .unwrap();

    assert!(entities.is_empty());
    assert_eq!(report.structural_skips, 1);
    assert_eq!(report.fetch_failures, 0);
}

#[tokio::test]
async fn test_licensed_series_yields_nothing() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/manga/licensed/",
        r#"<html><body><div class="detail_list">
        <div class="mt10 color_ff00 mb10">It has been licensed, it is not available.</div>
        </div></body></html>"#,
    )
    .await;

    let engine = engine_for(&server, false);
    let url = Url::parse(&format!("{}/manga/licensed/", server.uri())).unwrap();
    let (entities, report) = engine
        .start(FetchRequest::collection(url))
        .collect()
        .await
        .unwrap();

    assert!(entities.is_empty());
    assert_eq!(report.structural_skips, 1);
}

#[tokio::test]
async fn test_issue_pages_emitted_in_order() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(&server, "/manga/alpha/c001/", issue_page("alpha", 4)).await;

    // Earlier pages answer later.
    for n in 1..=4u32 {
        Mock::given(method("GET"))
            .and(path(format!("/manga/alpha/c001/{n}.html")))
            .respond_with(
                html(image_page(&base, n))
                    .set_delay(Duration::from_millis(u64::from(5 - n) * 60)),
            )
            .mount(&server)
            .await;
    }

    let manga = Arc::new(Manga::with_url(format!("{base}/manga/alpha/")));
    let issue = Arc::new(Issue::new(&manga.url, format!("{base}/manga/alpha/c001/")));
    let seed = FetchRequest::issue(manga, issue).unwrap();

    let engine = engine_for(&server, false);
    let (entities, report) = engine.start(seed).collect().await.unwrap();

    let pages: Vec<(u32, String)> = entities
        .iter()
        .filter_map(|e| match e {
            Entity::IssuePage(p) => Some((p.number, p.image_url.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(
        pages,
        (1..=4)
            .map(|n| (n, format!("{base}/store/{n}.jpg")))
            .collect::<Vec<_>>()
    );
    assert_eq!(report.entities_of("issue_page"), 4);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/manga/alpha/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/manga/alpha/"))
        .respond_with(html(series_page("Alpha", "alpha", &[1])))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine_for(&server, false);
    let url = Url::parse(&format!("{}/manga/alpha/", server.uri())).unwrap();
    let (entities, report) = engine
        .start(FetchRequest::collection(url))
        .collect()
        .await
        .unwrap();

    assert_eq!(manga_of(&entities).len(), 1);
    assert_eq!(report.retries, 1);
    assert_eq!(report.fetch_failures, 0);
}

#[tokio::test]
async fn test_missing_series_is_dropped_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/manga/missing/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine_for(&server, false);
    let url = Url::parse(&format!("{}/manga/missing/", server.uri())).unwrap();
    let (entities, report) = engine
        .start(FetchRequest::collection(url))
        .collect()
        .await
        .unwrap();

    assert!(entities.is_empty());
    assert_eq!(report.fetch_failures, 1);
    assert_eq!(report.retries, 0);
}

#[tokio::test]
async fn test_robots_disallow_is_permanent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /manga/\n"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/manga/alpha/"))
        .respond_with(html(series_page("Alpha", "alpha", &[1])))
        .expect(0)
        .mount(&server)
        .await;

    let engine = engine_for(&server, true);
    let url = Url::parse(&format!("{}/manga/alpha/", server.uri())).unwrap();
    let (entities, report) = engine
        .start(FetchRequest::collection(url))
        .collect()
        .await
        .unwrap();

    assert!(entities.is_empty());
    assert_eq!(report.fetch_failures, 1);
    assert_eq!(report.retries, 0);
}

#[tokio::test]
async fn test_recrawl_replaces_issue_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/manga/alpha/"))
        .respond_with(html(series_page("Alpha", "alpha", &[2, 1])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/manga/alpha/"))
        .respond_with(html(series_page("Alpha", "alpha", &[3, 2])))
        .mount(&server)
        .await;

    let engine = engine_for(&server, false);
    let url = Url::parse(&format!("{}/manga/alpha/", server.uri())).unwrap();
    let mut catalog = MangaCatalog::new();

    for _ in 0..2 {
        let handle = engine.start(FetchRequest::collection(url.clone()));
        drain_to_sink(handle, &mut catalog).await.unwrap();
    }

    assert_eq!(catalog.len(), 1);
    let manga = catalog.manga(url.as_str()).unwrap();
    let issues: Vec<&str> = manga.issues.iter().map(|i| i.url.as_str()).collect();
    assert_eq!(issues.len(), 2);
    assert!(issues[0].ends_with("/manga/alpha/c003/"));
    assert!(issues[1].ends_with("/manga/alpha/c002/"));
}

#[tokio::test]
async fn test_entities_written_as_json_lines() {
    let server = MockServer::start().await;
    mount_html(&server, "/manga/alpha/", series_page("Alpha", "alpha", &[2, 1])).await;

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("entities.jsonl");
    let mut sink = JsonLinesSink::open(out.to_str().unwrap()).unwrap();

    let engine = engine_for(&server, false);
    let url = Url::parse(&format!("{}/manga/alpha/", server.uri())).unwrap();
    let report = drain_to_sink(engine.start(FetchRequest::collection(url)), &mut sink)
        .await
        .unwrap();

    let written = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<serde_json::Value> = written
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(report.total_entities(), 1);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["kind"], "manga");
    assert_eq!(lines[0]["name"], "Alpha");
    assert_eq!(lines[0]["issues"].as_array().unwrap().len(), 2);
}
