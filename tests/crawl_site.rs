//! End-to-end crawl tests against a local fixture site.
//!
//! Each test spins up an axum server on an ephemeral port, points a
//! configured service at it, and asserts on the persisted pages, lemmas,
//! and site status afterwards.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use parking_lot::Mutex;
use tempfile::TempDir;

use sitelex::config::{Config, CrawlConfig, SiteEntry, StorageConfig};
use sitelex::indexing::{IndexingService, ServiceError};
use sitelex::morph::Lemmatizer;
use sitelex::storage::{SearchStore, SledStore};
use sitelex::types::SiteStatus;

/// Fixture site: serves canned pages and counts requests per path.
#[derive(Clone)]
struct Fixture {
    hits: Arc<Mutex<HashMap<String, usize>>>,
    response_delay: Duration,
}

impl Fixture {
    fn new(response_delay: Duration) -> Self {
        Self {
            hits: Arc::new(Mutex::new(HashMap::new())),
            response_delay,
        }
    }

    fn hits_for(&self, path: &str) -> usize {
        self.hits.lock().get(path).copied().unwrap_or(0)
    }

    fn was_requested(&self, path: &str) -> bool {
        self.hits.lock().contains_key(path)
    }
}

async fn fixture_page(State(fixture): State<Fixture>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    *fixture.hits.lock().entry(path.clone()).or_insert(0) += 1;
    if !fixture.response_delay.is_zero() {
        tokio::time::sleep(fixture.response_delay).await;
    }

    let html = |body: &str| {
        (
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            body.to_string(),
        )
            .into_response()
    };

    match path.as_str() {
        "/" => html(
            r#"<html><body>
                <p>бежит бежит быстро</p>
                <a href="/a">внутренняя</a>
                <a href="/c.pdf">документ</a>
                <a href="/plain">текст</a>
                <a href="http://cdn.invalid/logo.png">картинка</a>
            </body></html>"#,
        ),
        "/a" => html(
            r#"<html><body>
                <p>быстро и тихо</p>
                <a href="/">назад</a>
                <a href="/#frag">якорь</a>
            </body></html>"#,
        ),
        "/plain" => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            "очень быстро".to_string(),
        )
            .into_response(),
        path if path.starts_with("/p") => html("<html><body><p>страница</p></body></html>"),
        "/slow-root" => {
            let links: String = (1..=20)
                .map(|i| format!(r#"<a href="/p{i}">p{i}</a>"#))
                .collect();
            html(&format!("<html><body>{links}</body></html>"))
        }
        _ => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            "<html><body>нет</body></html>".to_string(),
        )
            .into_response(),
    }
}

async fn spawn_fixture(fixture: Fixture) -> SocketAddr {
    let app = Router::new()
        .fallback(fixture_page)
        .with_state(fixture);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn test_config(root: &str, data_dir: &TempDir) -> Config {
    Config {
        sites: vec![SiteEntry::new(root, "Fixture")],
        crawl: CrawlConfig {
            fetch_delay_ms: 0,
            max_concurrent_fetches: 4,
            ..CrawlConfig::default()
        },
        storage: StorageConfig {
            data_dir: data_dir.path().to_path_buf(),
        },
        ..Config::default()
    }
}

fn build_service(config: &Config) -> (Arc<dyn SearchStore>, IndexingService) {
    let store: Arc<dyn SearchStore> =
        Arc::new(SledStore::open(&config.storage.data_dir).unwrap());
    let service = IndexingService::new(config, Arc::clone(&store)).unwrap();
    (store, service)
}

#[tokio::test(flavor = "multi_thread")]
async fn crawl_campaign_respects_scope_and_counts_document_frequency() {
    let fixture = Fixture::new(Duration::ZERO);
    let addr = spawn_fixture(fixture.clone()).await;
    let root = format!("http://{addr}");
    let data_dir = TempDir::new().unwrap();
    let config = test_config(&root, &data_dir);
    let (store, service) = build_service(&config);

    service.start().unwrap();
    service.wait_idle().await;
    assert!(!service.is_running());

    // Only the two in-scope HTML documents were stored.
    let site = store.find_site_by_url(&root).unwrap().unwrap();
    assert_eq!(site.status, SiteStatus::Indexed);
    assert_eq!(site.last_error, None);
    assert_eq!(store.page_count(site.id).unwrap(), 2);
    assert!(store.find_page(site.id, "/").unwrap().is_some());
    assert!(store.find_page(site.id, "/a").unwrap().is_some());
    assert!(store.find_page(site.id, "/plain").unwrap().is_none());

    // /plain was fetched once and rejected on content type; /c.pdf was
    // filtered out before any request; every visited page was fetched once.
    assert_eq!(fixture.hits_for("/"), 1);
    assert_eq!(fixture.hits_for("/a"), 1);
    assert_eq!(fixture.hits_for("/plain"), 1);
    assert!(!fixture.was_requested("/c.pdf"));

    // "быстро" occurs on both pages, "бежит" twice on one page: lemma
    // frequency counts pages, not occurrences.
    let lemmatizer = Lemmatizer::new();
    let fast = lemmatizer.normal_form("быстро").unwrap();
    let runs = lemmatizer.normal_form("бежит").unwrap();
    assert_eq!(store.find_lemma(site.id, &fast).unwrap().unwrap().frequency, 2);
    assert_eq!(store.find_lemma(site.id, &runs).unwrap().unwrap().frequency, 1);
    // "и" is a conjunction and never becomes a lemma.
    assert!(store.find_lemma(site.id, "и").unwrap().is_none());

    let report = service.statistics().unwrap();
    assert_eq!(report.total.sites, 1);
    assert_eq!(report.total.pages, 2);
    assert!(!report.total.indexing);
    assert_eq!(report.detailed.len(), 1);
    assert_eq!(report.detailed[0].pages, 2);

    // Re-indexing a page on demand leaves document frequencies unchanged.
    service.index_single_page(&format!("{root}/a")).await.unwrap();
    service.index_single_page(&format!("{root}/a")).await.unwrap();
    assert_eq!(store.find_lemma(site.id, &fast).unwrap().unwrap().frequency, 2);

    // A fresh campaign resets the site and rebuilds the same index.
    service.start().unwrap();
    service.wait_idle().await;
    let site = store.find_site_by_url(&root).unwrap().unwrap();
    assert_eq!(store.page_count(site.id).unwrap(), 2);
    assert_eq!(store.find_lemma(site.id, &fast).unwrap().unwrap().frequency, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn stop_marks_sites_failed_and_allows_restart() {
    let fixture = Fixture::new(Duration::from_millis(200));
    let addr = spawn_fixture(fixture.clone()).await;
    let root = format!("http://{addr}/slow-root");
    let data_dir = TempDir::new().unwrap();
    let mut config = test_config(&root, &data_dir);
    config.crawl.max_concurrent_fetches = 1;
    let (store, service) = build_service(&config);

    service.start().unwrap();
    assert!(service.is_running());
    assert!(matches!(service.start(), Err(ServiceError::AlreadyRunning)));

    tokio::time::sleep(Duration::from_millis(100)).await;
    service.stop().unwrap();
    service.wait_idle().await;

    let site = store.find_site_by_url(&root).unwrap().unwrap();
    assert_eq!(site.status, SiteStatus::Failed);
    assert!(site.last_error.unwrap().contains("stopped"));
    assert!(matches!(service.stop(), Err(ServiceError::NotRunning)));

    // A stopped campaign does not block the next one.
    service.start().unwrap();
    service.wait_idle().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn stop_right_after_start_leaves_no_site_indexing() {
    let fixture = Fixture::new(Duration::from_millis(50));
    let addr = spawn_fixture(fixture.clone()).await;
    let root = format!("http://{addr}");
    let data_dir = TempDir::new().unwrap();
    let config = test_config(&root, &data_dir);
    let (store, service) = build_service(&config);

    // Stop before the spawned workers get a chance to create their site
    // rows; the rows appear as INDEXING after the stop sweep ran.
    service.start().unwrap();
    service.stop().unwrap();
    service.wait_idle().await;

    let site = store.find_site_by_url(&root).unwrap().unwrap();
    assert_eq!(site.status, SiteStatus::Failed);
    assert!(site.last_error.unwrap().contains("stopped"));
}

#[tokio::test(flavor = "multi_thread")]
async fn single_page_error_paths() {
    let fixture = Fixture::new(Duration::ZERO);
    let addr = spawn_fixture(fixture.clone()).await;
    let root = format!("http://{addr}");
    let data_dir = TempDir::new().unwrap();
    let config = test_config(&root, &data_dir);
    let (store, service) = build_service(&config);

    let outside = service.index_single_page("http://other.invalid/x").await;
    assert!(matches!(outside, Err(ServiceError::OutsideConfiguredScope)));

    let missing = service.index_single_page(&format!("{root}/missing")).await;
    assert!(matches!(missing, Err(ServiceError::BadStatus(404))));

    let plain = service.index_single_page(&format!("{root}/plain")).await;
    assert!(matches!(plain, Err(ServiceError::UnsupportedContentType(_))));

    // Failed attempts leave no page rows behind.
    let site = store.find_site_by_url(&root).unwrap().unwrap();
    assert_eq!(store.page_count(site.id).unwrap(), 0);

    // A successful single-page index works without any campaign.
    service.index_single_page(&format!("{root}/a")).await.unwrap();
    let site = store.find_site_by_url(&root).unwrap().unwrap();
    assert_eq!(site.status, SiteStatus::Indexed);
    assert!(store.find_page(site.id, "/a").unwrap().is_some());
    assert_eq!(store.page_count(site.id).unwrap(), 1);
}
