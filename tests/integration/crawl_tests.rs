//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end through the real HTTP fetcher.

use ripple_sitemap::config::Config;
use ripple_sitemap::{CrawlEvent, SitemapGenerator};
use tempfile::TempDir;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing into `dir`
fn create_test_config(seed: &str, dir: &TempDir) -> Config {
    let mut config = Config::with_seed(seed);
    config.crawler.concurrency = 4;
    config.crawler.timeout = 5_000;
    config.user_agent.crawler_name = "TestBot".to_string();
    config.user_agent.crawler_version = "1.0.0".to_string();
    config.output.filepath = dir
        .path()
        .join("sitemap.xml")
        .to_string_lossy()
        .into_owned();
    config
}

/// An HTML response
fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), "text/html")
}

/// A page linking to every href in `hrefs`
fn page(title: &str, hrefs: &[&str]) -> ResponseTemplate {
    let anchors: String = hrefs
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
        .collect();
    html(format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, anchors
    ))
}

async fn mount_page(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

async fn run_crawl(config: &Config) -> (ripple_sitemap::RunSummary, Vec<CrawlEvent>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let generator = SitemapGenerator::from_config(config)
        .expect("Failed to create generator")
        .with_event_sink(tx);

    let summary = generator.start().await.expect("Crawl failed");

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    (summary, events)
}

fn read_sitemap(dir: &TempDir, name: &str) -> String {
    std::fs::read_to_string(dir.path().join(name)).expect("Failed to read sitemap")
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    // Start a mock server
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(
        &mock_server,
        "/",
        page("Home", &[&format!("{}/page1", base_url), "page2", "/page1#top"]),
    )
    .await;
    mount_page(&mock_server, "/page1", page("Page 1", &["/", "/page2"])).await;
    mount_page(
        &mock_server,
        "/page2",
        page("Page 2", &["/page1", "https://elsewhere.example/", "/style.css"]),
    )
    .await;

    let config = create_test_config(&format!("{}/", base_url), &dir);
    let (summary, events) = run_crawl(&config).await;

    assert_eq!(summary.entries, 3);
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.paths, vec![dir.path().join("sitemap.xml")]);

    let xml = read_sitemap(&dir, "sitemap.xml");
    assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8" standalone="yes" ?>"#));
    for route in ["/", "/page1", "/page2"] {
        let loc = format!("<loc>{}{}</loc>", base_url, route);
        assert_eq!(xml.matches(&loc).count(), 1, "expected {} once", loc);
    }
    assert!(!xml.contains("elsewhere.example"));

    let added = events
        .iter()
        .filter(|event| matches!(event, CrawlEvent::Add { .. }))
        .count();
    assert_eq!(added, 3);
    assert!(matches!(events.last(), Some(CrawlEvent::Done { entries: 3, .. })));
}

#[tokio::test]
async fn test_noindex_page_is_ignored() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(&mock_server, "/", page("Home", &["/hidden"])).await;
    mount_page(
        &mock_server,
        "/hidden",
        html(
            r#"<html><head><meta name="robots" content="noindex,follow"></head>
               <body><a href="/visible">Visible</a></body></html>"#,
        ),
    )
    .await;
    mount_page(&mock_server, "/visible", page("Visible", &[])).await;

    let config = create_test_config(&format!("{}/", base_url), &dir);
    let (summary, events) = run_crawl(&config).await;

    let xml = read_sitemap(&dir, "sitemap.xml");
    assert!(!xml.contains("/hidden"));
    assert!(xml.contains(&format!("<loc>{}/visible</loc>", base_url)));
    assert_eq!(summary.ignored, 1);
    assert!(events.contains(&CrawlEvent::Ignore {
        url: format!("{}/hidden", base_url)
    }));
}

#[tokio::test]
async fn test_rotation_writes_index() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(&mock_server, "/", page("Home", &["/a", "/b", "/c", "/d"])).await;
    for route in ["/a", "/b", "/c", "/d"] {
        mount_page(&mock_server, route, page(route, &[])).await;
    }

    let mut config = create_test_config(&format!("{}/", base_url), &dir);
    config.output.max_entries_per_file = 2;
    let (summary, _events) = run_crawl(&config).await;

    assert_eq!(summary.entries, 5);
    assert_eq!(summary.paths.len(), 4);

    let total: usize = (1..=3)
        .map(|i| read_sitemap(&dir, &format!("sitemap_part{}.xml", i)))
        .map(|part| part.matches("<url>").count())
        .sum();
    assert_eq!(total, 5);

    let index = read_sitemap(&dir, "sitemap.xml");
    assert!(index.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    for i in 1..=3 {
        assert!(index.contains(&format!("<loc>{}/sitemap_part{}.xml</loc>", base_url, i)));
    }
}

#[tokio::test]
async fn test_depth_limit() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(&mock_server, "/", page("Home", &["/level1"])).await;
    mount_page(&mock_server, "/level1", page("Level 1", &["/level2"])).await;

    // Depth 2 must never be requested
    Mock::given(method("GET"))
        .and(path("/level2"))
        .respond_with(page("Level 2", &[]))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&format!("{}/", base_url), &dir);
    config.crawler.max_depth = 1;
    let (summary, _events) = run_crawl(&config).await;

    assert_eq!(summary.entries, 2);
}

#[tokio::test]
async fn test_missing_page_reports_not_found() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(&mock_server, "/", page("Home", &["/missing", "/gone"])).await;

    // One attempt plus one retry each
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&format!("{}/", base_url), &dir);
    let (summary, events) = run_crawl(&config).await;

    assert_eq!(summary.errors, 2);
    for route in ["/missing", "/gone"] {
        let url = format!("{}{}", base_url, route);
        let notices: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                CrawlEvent::Error(notice) if notice.url.as_deref() == Some(url.as_str()) => {
                    Some(notice)
                }
                _ => None,
            })
            .collect();
        assert_eq!(notices.len(), 1, "expected one error for {}", url);
        assert_eq!(notices[0].code, 404);
        assert_eq!(notices[0].message, "Not Found");
    }
}

#[tokio::test]
async fn test_non_html_response_is_an_error() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(&mock_server, "/", page("Home", &["/feed"])).await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&format!("{}/", base_url), &dir);
    let (summary, events) = run_crawl(&config).await;

    assert_eq!(summary.entries, 1);
    assert!(events.iter().any(|event| matches!(
        event,
        CrawlEvent::Error(notice) if notice.code == 500
    )));
    assert!(!read_sitemap(&dir, "sitemap.xml").contains("/feed"));
}

#[tokio::test]
async fn test_robots_txt_respect() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    // Mock robots.txt that disallows /admin
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /admin"))
        .mount(&mock_server)
        .await;

    mount_page(&mock_server, "/", page("Home", &["/allowed", "/admin"])).await;
    mount_page(&mock_server, "/allowed", page("Allowed", &[])).await;

    // Admin page should never be requested
    Mock::given(method("GET"))
        .and(path("/admin"))
        .respond_with(page("Admin", &[]))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&format!("{}/", base_url), &dir);
    let (summary, events) = run_crawl(&config).await;

    assert_eq!(summary.entries, 2);
    assert_eq!(summary.robots_skipped, 1);
    assert!(!events
        .iter()
        .any(|event| matches!(event, CrawlEvent::Error(_))));
}
