//! Integration tests for the crawler
//!
//! Most tests drive the crawler with an in-memory link graph so traversal,
//! failure and concurrency properties can be checked precisely. The last
//! group uses wiremock to run the full HTTP cycle end-to-end.

use async_trait::async_trait;
use parallel_crawler::config::{CrawlerConfig, ExtractionPolicy, UserAgentConfig};
use parallel_crawler::crawler::{Document, Downloader, HttpDownloader, WebCrawler};
use parallel_crawler::url::host_filter;
use parallel_crawler::{CrawlError, DownloadError, ExtractError, PageError};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// How a page of the fake graph behaves
#[derive(Clone)]
enum FakePage {
    Links(Vec<String>),
    /// Extraction fails after yielding these links
    BrokenLinks(Vec<String>),
}

/// In-memory downloader over a link graph
///
/// URLs missing from the graph fail with a 404. Every call is counted, and
/// concurrent calls are tracked per host.
#[derive(Default)]
struct GraphDownloader {
    pages: HashMap<String, FakePage>,
    delay: Duration,
    never_finish: HashSet<String>,
    downloads: Mutex<HashMap<String, usize>>,
    in_flight: Mutex<HashMap<String, usize>>,
    peak: Mutex<HashMap<String, usize>>,
    extractions: Arc<AtomicUsize>,
}

impl GraphDownloader {
    fn new() -> Self {
        Self::default()
    }

    fn page(mut self, url: &str, links: &[&str]) -> Self {
        self.pages.insert(
            url.to_string(),
            FakePage::Links(links.iter().map(|s| s.to_string()).collect()),
        );
        self
    }

    fn broken_page(mut self, url: &str, recovered: &[&str]) -> Self {
        self.pages.insert(
            url.to_string(),
            FakePage::BrokenLinks(recovered.iter().map(|s| s.to_string()).collect()),
        );
        self
    }

    fn hanging(mut self, url: &str) -> Self {
        self.never_finish.insert(url.to_string());
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn download_count(&self, url: &str) -> usize {
        self.downloads.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn total_downloads(&self) -> usize {
        self.downloads.lock().unwrap().values().sum()
    }

    fn peak_for(&self, host: &str) -> usize {
        self.peak.lock().unwrap().get(host).copied().unwrap_or(0)
    }
}

fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

struct FakeDocument {
    page: FakePage,
    extractions: Arc<AtomicUsize>,
}

impl Document for FakeDocument {
    fn extract_links(&self) -> Result<Vec<String>, ExtractError> {
        self.extractions.fetch_add(1, Ordering::SeqCst);
        match &self.page {
            FakePage::Links(links) => Ok(links.clone()),
            FakePage::BrokenLinks(links) => {
                Err(ExtractError::partial("truncated document", links.clone()))
            }
        }
    }
}

#[async_trait]
impl Downloader for GraphDownloader {
    type Document = FakeDocument;

    async fn download(&self, url: &str) -> Result<FakeDocument, DownloadError> {
        let host = host_of(url);
        *self.downloads.lock().unwrap().entry(url.to_string()).or_default() += 1;
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            let now = in_flight.entry(host.clone()).or_default();
            *now += 1;
            let mut peak = self.peak.lock().unwrap();
            let high = peak.entry(host.clone()).or_default();
            *high = (*high).max(*now);
        }

        if self.never_finish.contains(url) {
            std::future::pending::<()>().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        *self.in_flight.lock().unwrap().entry(host).or_default() -= 1;

        self.pages
            .get(url)
            .map(|page| FakeDocument {
                page: page.clone(),
                extractions: Arc::clone(&self.extractions),
            })
            .ok_or(DownloadError::Status { status: 404 })
    }
}

fn config() -> CrawlerConfig {
    CrawlerConfig {
        max_depth: 3,
        downloaders: 4,
        extractors: 2,
        per_host: 2,
        extraction_policy: ExtractionPolicy::Discard,
    }
}

fn sorted(urls: &[String]) -> Vec<&str> {
    let mut urls: Vec<&str> = urls.iter().map(String::as_str).collect();
    urls.sort();
    urls
}

/// Runs a crawl with a shared downloader so the test can inspect it afterwards
async fn crawl_with(
    downloader: &Arc<GraphDownloader>,
    config: &CrawlerConfig,
    seed: &str,
    depth: usize,
) -> parallel_crawler::CrawlReport {
    let crawler = WebCrawler::new(Arc::clone(downloader), config).unwrap();
    timeout(Duration::from_secs(10), crawler.crawl(seed, depth))
        .await
        .expect("crawl should finish")
        .expect("crawl should succeed")
}

#[tokio::test]
async fn test_diamond_downloads_shared_page_once() {
    let downloader = Arc::new(
        GraphDownloader::new()
            .page("https://a.test/", &["https://b.test/", "https://c.test/"])
            .page("https://b.test/", &["https://d.test/"])
            .page("https://c.test/", &["https://d.test/"])
            .page("https://d.test/", &[]),
    );

    let report = crawl_with(&downloader, &config(), "https://a.test/", 3).await;

    assert_eq!(
        sorted(&report.downloaded),
        vec!["https://a.test/", "https://b.test/", "https://c.test/", "https://d.test/"]
    );
    assert!(report.errors.is_empty());
    assert_eq!(downloader.download_count("https://d.test/"), 1);
    assert_eq!(downloader.total_downloads(), 4);
}

#[tokio::test]
async fn test_depth_one_downloads_only_seed() {
    let downloader = Arc::new(
        GraphDownloader::new()
            .page("https://a.test/", &["https://b.test/"])
            .page("https://b.test/", &[]),
    );

    let report = crawl_with(&downloader, &config(), "https://a.test/", 1).await;

    assert_eq!(report.downloaded, vec!["https://a.test/".to_string()]);
    assert_eq!(downloader.total_downloads(), 1);
    assert_eq!(downloader.extractions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_depth_limits_reach() {
    // Chain a -> b -> c -> d -> e
    let downloader = Arc::new(
        GraphDownloader::new()
            .page("https://a.test/", &["https://b.test/"])
            .page("https://b.test/", &["https://c.test/"])
            .page("https://c.test/", &["https://d.test/"])
            .page("https://d.test/", &["https://e.test/"])
            .page("https://e.test/", &[]),
    );

    let report = crawl_with(&downloader, &config(), "https://a.test/", 3).await;

    assert_eq!(
        sorted(&report.downloaded),
        vec!["https://a.test/", "https://b.test/", "https://c.test/"]
    );
    assert_eq!(downloader.download_count("https://d.test/"), 0);
    // The last level is downloaded but never parsed
    assert_eq!(downloader.extractions.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_depth_zero_returns_empty_report() {
    let downloader = Arc::new(GraphDownloader::new().page("https://a.test/", &[]));

    let report = crawl_with(&downloader, &config(), "https://a.test/", 0).await;

    assert_eq!(report.visited(), 0);
    assert_eq!(downloader.total_downloads(), 0);
}

#[tokio::test]
async fn test_failing_page_does_not_stop_siblings() {
    let downloader = Arc::new(
        GraphDownloader::new()
            .page(
                "https://a.test/",
                &["https://a.test/ok", "https://a.test/missing", "https://b.test/"],
            )
            .page("https://a.test/ok", &[])
            .page("https://b.test/", &[]),
    );

    let report = crawl_with(&downloader, &config(), "https://a.test/", 2).await;

    assert_eq!(
        sorted(&report.downloaded),
        vec!["https://a.test/", "https://a.test/ok", "https://b.test/"]
    );
    assert_eq!(report.errors.len(), 1);
    assert!(matches!(
        report.errors.get("https://a.test/missing"),
        Some(PageError::Download(DownloadError::Status { status: 404 }))
    ));
    assert!(!report
        .downloaded
        .iter()
        .any(|url| report.errors.contains_key(url)));
}

#[tokio::test]
async fn test_malformed_link_is_reported_without_download() {
    let downloader = Arc::new(
        GraphDownloader::new().page("https://a.test/", &["not a url", "https://b.test/"]),
    );

    let report = crawl_with(&downloader, &config(), "https://a.test/", 2).await;

    assert!(matches!(
        report.errors.get("not a url"),
        Some(PageError::InvalidUrl(_))
    ));
    assert_eq!(downloader.download_count("not a url"), 0);
    // b.test is not in the graph, so it is a download failure instead
    assert!(matches!(
        report.errors.get("https://b.test/"),
        Some(PageError::Download(_))
    ));
    assert_eq!(report.downloaded, vec!["https://a.test/".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_per_host_limit_is_respected() {
    let links: Vec<String> = (0..12).map(|i| format!("https://busy.test/{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();

    let mut graph = GraphDownloader::new()
        .with_delay(Duration::from_millis(20))
        .page("https://busy.test/", &link_refs);
    for link in &links {
        graph = graph.page(link, &[]);
    }
    let downloader = Arc::new(graph);

    let mut config = config();
    config.downloaders = 8;
    config.per_host = 3;

    let report = crawl_with(&downloader, &config, "https://busy.test/", 2).await;

    assert_eq!(report.downloaded.len(), 13);
    assert!(report.errors.is_empty());
    let peak = downloader.peak_for("busy.test");
    assert!(peak <= 3, "peak per-host concurrency was {}", peak);
    assert!(peak >= 2, "downloads never overlapped (peak {})", peak);
}

#[tokio::test]
async fn test_discard_policy_ignores_partial_links() {
    let downloader = Arc::new(
        GraphDownloader::new()
            .broken_page("https://a.test/", &["https://b.test/"])
            .page("https://b.test/", &[]),
    );

    let report = crawl_with(&downloader, &config(), "https://a.test/", 2).await;

    assert!(report.downloaded.is_empty());
    assert!(matches!(
        report.errors.get("https://a.test/"),
        Some(PageError::Extract(e)) if e.recovered == vec!["https://b.test/".to_string()]
    ));
    assert_eq!(downloader.download_count("https://b.test/"), 0);
}

#[tokio::test]
async fn test_keep_partial_policy_follows_recovered_links() {
    let downloader = Arc::new(
        GraphDownloader::new()
            .broken_page("https://a.test/", &["https://b.test/"])
            .page("https://b.test/", &[]),
    );

    let mut config = config();
    config.extraction_policy = ExtractionPolicy::KeepPartial;

    let report = crawl_with(&downloader, &config, "https://a.test/", 2).await;

    assert_eq!(report.downloaded, vec!["https://b.test/".to_string()]);
    assert!(matches!(
        report.errors.get("https://a.test/"),
        Some(PageError::Extract(_))
    ));
    assert_eq!(downloader.download_count("https://b.test/"), 1);
}

#[tokio::test]
async fn test_filter_excludes_urls() {
    let downloader = Arc::new(
        GraphDownloader::new()
            .page("https://a.test/", &["https://a.test/in", "https://other.test/"])
            .page("https://a.test/in", &[])
            .page("https://other.test/", &[]),
    );

    let crawler = WebCrawler::new(Arc::clone(&downloader), &config())
        .unwrap()
        .with_filter(host_filter(&["a.test".to_string()]));
    let report = crawler.crawl("https://a.test/", 2).await.unwrap();

    assert_eq!(
        sorted(&report.downloaded),
        vec!["https://a.test/", "https://a.test/in"]
    );
    assert!(report.errors.is_empty());
    assert_eq!(downloader.download_count("https://other.test/"), 0);
}

#[tokio::test]
async fn test_filtered_seed_returns_empty_report() {
    let downloader = Arc::new(GraphDownloader::new().page("https://a.test/", &[]));

    let crawler = WebCrawler::new(Arc::clone(&downloader), &config())
        .unwrap()
        .with_filter(Arc::new(|_: &str| false));
    let report = crawler.crawl("https://a.test/", 3).await.unwrap();

    assert_eq!(report.visited(), 0);
    assert_eq!(downloader.total_downloads(), 0);
}

#[tokio::test]
async fn test_crawler_is_reusable() {
    let downloader = Arc::new(
        GraphDownloader::new()
            .page("https://a.test/", &["https://b.test/"])
            .page("https://b.test/", &[]),
    );
    let crawler = WebCrawler::new(Arc::clone(&downloader), &config()).unwrap();

    let first = crawler.crawl("https://a.test/", 2).await.unwrap();
    let second = crawler.crawl("https://a.test/", 2).await.unwrap();

    // Each crawl has its own visited set
    assert_eq!(first.downloaded.len(), 2);
    assert_eq!(second.downloaded.len(), 2);
    assert_eq!(downloader.download_count("https://a.test/"), 2);
}

#[tokio::test]
async fn test_crawl_after_close_fails() {
    let crawler = WebCrawler::new(GraphDownloader::new(), &config()).unwrap();
    crawler.close();

    let result = crawler.crawl("https://a.test/", 2).await;
    assert!(matches!(result, Err(CrawlError::Closed)));
}

#[tokio::test]
async fn test_close_interrupts_running_crawl() {
    let downloader = GraphDownloader::new()
        .page("https://a.test/", &["https://a.test/stuck"])
        .hanging("https://a.test/stuck");
    let crawler = Arc::new(WebCrawler::new(downloader, &config()).unwrap());

    let closer = {
        let crawler = Arc::clone(&crawler);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            crawler.close();
        })
    };

    let result = timeout(Duration::from_secs(5), crawler.crawl("https://a.test/", 2))
        .await
        .expect("close should unblock the crawl");

    assert!(matches!(result, Err(CrawlError::Closed)));
    closer.await.unwrap();
}

#[tokio::test]
async fn test_zero_sized_pool_is_rejected() {
    let mut config = config();
    config.downloaders = 0;

    let result = WebCrawler::new(GraphDownloader::new(), &config);
    assert!(matches!(result, Err(CrawlError::Config(_))));
}

fn test_user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html; charset=utf-8")
}

#[tokio::test]
async fn test_http_crawl_end_to_end() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<a href="/page1">Page 1</a>
               <a href="/page2#section">Page 2</a>
               <a href="/gone">Gone</a>
               <a href="mailto:someone@example.com">Mail</a>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html(r#"<a href="/">Home</a><a href="/deep">Deep</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html(r#"<a href="/page1">Back</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/deep"))
        .respond_with(html("deep"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let downloader = HttpDownloader::new(&test_user_agent()).unwrap();
    let crawler = WebCrawler::new(downloader, &config()).unwrap();

    let seed = format!("{}/", base_url);
    let report = timeout(Duration::from_secs(10), crawler.crawl(&seed, 2))
        .await
        .expect("crawl should finish")
        .unwrap();

    let mut expected = vec![
        format!("{}/", base_url),
        format!("{}/page1", base_url),
        format!("{}/page2", base_url),
    ];
    expected.sort();
    let mut downloaded = report.downloaded.clone();
    downloaded.sort();
    assert_eq!(downloaded, expected);

    assert_eq!(report.errors.len(), 1);
    assert!(matches!(
        report.errors.get(&format!("{}/gone", base_url)),
        Some(PageError::Download(DownloadError::Status { status: 404 }))
    ));
}

#[tokio::test]
async fn test_http_non_html_is_not_parsed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"href": "<a href=\"/hidden\">x</a>"}"#)
                .insert_header("content-type", "application/json"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/hidden"))
        .respond_with(html("hidden"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let downloader = HttpDownloader::new(&test_user_agent()).unwrap();
    let crawler = WebCrawler::new(downloader, &config()).unwrap();

    let seed = format!("{}/data.json", mock_server.uri());
    let report = crawler.crawl(&seed, 3).await.unwrap();

    assert_eq!(report.downloaded, vec![seed]);
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn test_http_latin1_page_is_decoded() {
    let mock_server = MockServer::start().await;

    // "Café" in ISO-8859-1 is not valid UTF-8
    let mut body = b"<html><body><p>Caf\xe9</p>".to_vec();
    body.extend_from_slice(br#"<a href="/next">next</a></body></html>"#);

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=iso-8859-1"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/next"))
        .respond_with(html("next"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let downloader = HttpDownloader::new(&test_user_agent()).unwrap();
    let crawler = WebCrawler::new(downloader, &config()).unwrap();

    let seed = format!("{}/", mock_server.uri());
    let report = timeout(Duration::from_secs(10), crawler.crawl(&seed, 2))
        .await
        .expect("crawl should finish")
        .unwrap();

    assert!(report.errors.is_empty(), "{:?}", report.errors);
    let mut expected = vec![seed, format!("{}/next", mock_server.uri())];
    expected.sort();
    assert_eq!(sorted(&report.downloaded), expected);
}
