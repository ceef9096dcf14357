//! Integration tests for the harvester
//!
//! These tests run whole harvests against an in-memory lazily loading list
//! (or static pages served by wiremock) and a wiremock Meilisearch, with the
//! progress store and journal on disk.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tidemark::automation::{Browser, HttpBrowser, Page};
use tidemark::config::{parse_config, Config, IndexCredentials};
use tidemark::index::MeiliClient;
use tidemark::pipeline::Harvester;
use tidemark::storage::{FailureKind, Journal, ProgressStore, RunMode, SourcesFile};
use tidemark::{DriverError, DriverResult};
use tokio::sync::watch;
use wiremock::matchers::{body_string_contains, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LIST_URL: &str = "https://mp.example.com/album?id=7";

fn detail_link(number: u32) -> String {
    format!("https://mp.example.com/s/issue-{}", number)
}

fn detail_markup(number: u32) -> String {
    format!(
        r#"<html><body>
<h1 id="activity-name">Issue {n}</h1>
<em id="publish_time">2024年05月12日 10:30</em>
<div id="js_content">
  <p>Crate of the week {n}</p>
  <section><section><p>blurb</p><p>https://crates.example.com/week-{n}</p></section></section>
  <p>Release notes {n}</p>
  <section><section><p>blurb</p><p>https://blog.example.com/{n}/notes</p></section></section>
</div>
</body></html>"#,
        n = number
    )
}

fn list_item(number: u32) -> String {
    format!(
        r#"<div class="album__list-item" data-title="Issue {n}" data-link="{link}"><span class="weui-mask-ellipsis__text">{n}. Issue {n}</span></div>"#,
        n = number,
        link = detail_link(number)
    )
}

/// A newest-first list of `total` issues that loads `page_size` more on
/// every scroll and can be flipped to oldest-first
#[derive(Clone)]
struct LazyAlbum {
    total: u32,
    page_size: u32,
}

#[async_trait]
impl Browser for LazyAlbum {
    async fn open_page(&self) -> DriverResult<Box<dyn Page>> {
        let (mutations, _) = watch::channel(0);
        Ok(Box::new(LazyAlbumPage {
            album: self.clone(),
            state: Mutex::new((String::new(), false, 0)),
            mutations,
        }))
    }
}

struct LazyAlbumPage {
    album: LazyAlbum,
    /// (url, ascending, loaded)
    state: Mutex<(String, bool, u32)>,
    mutations: watch::Sender<u64>,
}

#[async_trait]
impl Page for LazyAlbumPage {
    async fn navigate(&self, url: &str) -> DriverResult<()> {
        *self.state.lock().unwrap() = (url.to_string(), false, self.album.page_size.min(self.album.total));
        Ok(())
    }

    async fn content(&self) -> DriverResult<String> {
        let (url, ascending, loaded) = self.state.lock().unwrap().clone();
        if url == LIST_URL {
            let items: String = if ascending {
                (1..=loaded).map(list_item).collect()
            } else {
                (0..loaded).map(|i| list_item(self.album.total - i)).collect()
            };
            return Ok(format!(
                r#"<html><body><span class="js_positive_order">Oldest first</span><div class="album__list">{}</div></body></html>"#,
                items
            ));
        }
        let number = url
            .strip_prefix("https://mp.example.com/s/issue-")
            .and_then(|n| n.parse().ok());
        Ok(match number {
            Some(n) if n <= self.album.total => detail_markup(n),
            _ => "<html><body></body></html>".to_string(),
        })
    }

    async fn click(&self, selector: &str) -> DriverResult<()> {
        if selector != ".js_positive_order" {
            return Err(DriverError::Unsupported(selector.to_string()));
        }
        {
            let mut state = self.state.lock().unwrap();
            state.1 = true;
            state.2 = self.album.page_size.min(self.album.total);
        }
        self.mutations.send_modify(|n| *n += 1);
        Ok(())
    }

    async fn scroll_into_view(&self, _selector: &str) -> DriverResult<()> {
        let grew = {
            let mut state = self.state.lock().unwrap();
            let before = state.2;
            state.2 = (state.2 + self.album.page_size).min(self.album.total);
            state.2 != before
        };
        if grew {
            self.mutations.send_modify(|n| *n += 1);
        }
        Ok(())
    }

    fn mutations(&self) -> watch::Receiver<u64> {
        self.mutations.subscribe()
    }

    async fn close(&self) -> DriverResult<()> {
        Ok(())
    }
}

fn create_test_config() -> Arc<Config> {
    Arc::new(
        parse_config(
            r#"
[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[walker]
wait-timeout-ms = 500

[index]
task-timeout-ms = 1000
poll-interval-ms = 10

[storage]
sources-path = "sources.toml"
journal-path = "journal.db"
"#,
        )
        .unwrap(),
    )
}

fn write_sources(dir: &Path, url: &str, current_number: u32) -> SourcesFile {
    let path = dir.join("sources.toml");
    fs::write(
        &path,
        format!(
            r#"[sources.weekly]
title = "Weekly"
url = "{}"
current-number = {}
index-id = "weekly"
"#,
            url, current_number
        ),
    )
    .unwrap();
    SourcesFile::new(path)
}

fn persisted_current(dir: &Path) -> u32 {
    SourcesFile::new(dir.join("sources.toml"))
        .read_tracked_sources()
        .unwrap()[0]
        .current_number
}

async fn mount_meilisearch(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/indexes/weekly/documents"))
        .and(query_param("primaryKey", "id"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "taskUid": 1,
            "indexUid": "weekly",
            "status": "enqueued",
            "type": "documentAdditionOrUpdate"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/tasks/\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uid": 1,
            "status": "succeeded",
            "type": "documentAdditionOrUpdate"
        })))
        .mount(server)
        .await;
}

fn meili(server: &MockServer, config: &Config) -> Box<MeiliClient> {
    let credentials = IndexCredentials {
        host: server.uri(),
        api_key: "masterKey".to_string(),
    };
    Box::new(MeiliClient::new(&credentials, &config.index).unwrap())
}

async fn submitted_numbers(server: &MockServer) -> Vec<String> {
    let mut numbers = Vec::new();
    for request in server.received_requests().await.unwrap_or_default() {
        if !request.url.path().ends_with("/documents") {
            continue;
        }
        let records: Vec<serde_json::Value> = serde_json::from_slice(&request.body).unwrap();
        numbers.push(records[0]["number"].as_str().unwrap().to_string());
    }
    numbers
}

#[tokio::test]
async fn test_harvest_resumes_from_saved_progress() {
    let dir = TempDir::new().unwrap();
    let store = write_sources(dir.path(), LIST_URL, 5);
    let server = MockServer::start().await;
    mount_meilisearch(&server).await;

    let config = create_test_config();
    let harvester = Harvester::new(config.clone(), Box::new(LazyAlbum { total: 12, page_size: 4 }))
        .with_index(meili(&server, &config));

    let report = harvester.update_documents(&store).await.unwrap();

    assert!(report.is_success());
    let source = &report.sources[0];
    assert!(!source.descending, "5/12 is below the reorder threshold");
    assert_eq!(source.items_found, 7);
    assert_eq!(source.items_indexed, 7);
    assert_eq!(source.records, 14);
    assert_eq!(
        submitted_numbers(&server).await,
        vec!["6", "7", "8", "9", "10", "11", "12"]
    );
    assert_eq!(persisted_current(dir.path()), 12);

    // Nothing new on the next run
    let store = SourcesFile::new(dir.path().join("sources.toml"));
    let report = harvester.update_documents(&store).await.unwrap();
    assert_eq!(report.total_items(), 0);
    assert_eq!(persisted_current(dir.path()), 12);
}

#[tokio::test]
async fn test_failing_submission_does_not_stop_the_run() {
    let dir = TempDir::new().unwrap();
    let store = write_sources(dir.path(), LIST_URL, 5);
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains(r#""number":"9""#))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;
    mount_meilisearch(&server).await;

    let config = create_test_config();
    let journal = Arc::new(Mutex::new(Journal::open(&dir.path().join("journal.db")).unwrap()));
    let run_id = journal
        .lock()
        .unwrap()
        .create_run(RunMode::UpdateDocuments, "test")
        .unwrap();

    let report = Harvester::new(config.clone(), Box::new(LazyAlbum { total: 12, page_size: 4 }))
        .with_index(meili(&server, &config))
        .with_journal(journal.clone(), run_id)
        .update_documents(&store)
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.sources[0].items_attempted(), 7);
    assert_eq!(report.sources[0].items_failed, 1);
    assert_eq!(submitted_numbers(&server).await.len(), 7);
    assert_eq!(persisted_current(dir.path()), 12);

    let failures = journal.lock().unwrap().failures_for_run(run_id).unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FailureKind::Submission);
    assert_eq!(failures[0].item_number.as_deref(), Some("9"));
    assert!(failures[0].message.contains("500"));
    assert!(failures[0]
        .records_json
        .as_deref()
        .unwrap()
        .contains("https://crates.example.com/week-9"));
}

#[tokio::test]
async fn test_static_pages_walk_newest_first() {
    let dir = TempDir::new().unwrap();
    let site = MockServer::start().await;
    let meilisearch = MockServer::start().await;
    mount_meilisearch(&meilisearch).await;

    // The whole list is in the initial response, newest first, and links
    // to detail pages on the same server
    let items: String = (1..=12u32)
        .rev()
        .map(|n| {
            format!(
                r#"<div data-title="Issue {n}" data-link="{base}/s/issue-{n}"><span class="weui-mask-ellipsis__text">{n}. Issue {n}</span></div>"#,
                n = n,
                base = site.uri()
            )
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/album"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<html><body><div class="album__list">{}</div></body></html>"#,
            items
        )))
        .mount(&site)
        .await;
    for n in [11u32, 12] {
        Mock::given(method("GET"))
            .and(path(format!("/s/issue-{}", n)))
            .respond_with(ResponseTemplate::new(200).set_body_string(detail_markup(n)))
            .expect(1)
            .mount(&site)
            .await;
    }

    let store = write_sources(dir.path(), &format!("{}/album", site.uri()), 10);
    let config = create_test_config();
    let browser = HttpBrowser::from_config(&config.user_agent).unwrap();

    let report = Harvester::new(config.clone(), Box::new(browser))
        .with_index(meili(&meilisearch, &config))
        .update_documents(&store)
        .await
        .unwrap();

    assert!(report.sources[0].descending);
    assert_eq!(submitted_numbers(&meilisearch).await, vec!["12", "11"]);
    assert_eq!(persisted_current(dir.path()), 12);
}

#[tokio::test]
async fn test_static_pages_cannot_reorder() {
    let dir = TempDir::new().unwrap();
    let site = MockServer::start().await;
    let meilisearch = MockServer::start().await;
    mount_meilisearch(&meilisearch).await;

    Mock::given(method("GET"))
        .and(path("/album"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<html><body><div class="album__list">{}</div></body></html>"#,
            list_item(12)
        )))
        .mount(&site)
        .await;

    let store = write_sources(dir.path(), &format!("{}/album", site.uri()), 2);
    let config = create_test_config();
    let browser = HttpBrowser::from_config(&config.user_agent).unwrap();

    let report = Harvester::new(config.clone(), Box::new(browser))
        .with_index(meili(&meilisearch, &config))
        .update_documents(&store)
        .await
        .unwrap();

    assert_eq!(report.failed_sources, vec!["weekly".to_string()]);
    assert!(submitted_numbers(&meilisearch).await.is_empty());
    assert_eq!(persisted_current(dir.path()), 2);
}

#[tokio::test]
async fn test_update_settings_reaches_every_index() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("sources.toml"),
        r#"
[sources.weekly]
title = "Weekly"
url = "https://mp.example.com/album?id=1"
current-number = 3
index-id = "weekly"

[sources.digest]
title = "Digest"
url = "https://mp.example.com/album?id=2"
current-number = 8
index-id = "digest"
"#,
    )
    .unwrap();
    let store = SourcesFile::new(dir.path().join("sources.toml"));

    let server = MockServer::start().await;
    for index in ["weekly", "digest"] {
        Mock::given(method("PATCH"))
            .and(path(format!("/indexes/{}/settings", index)))
            .and(body_string_contains("publishTimestamp:desc"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({"taskUid": 4})))
            .expect(1)
            .mount(&server)
            .await;
    }
    mount_meilisearch(&server).await;

    let config = create_test_config();
    let report = Harvester::new(config.clone(), Box::new(LazyAlbum { total: 1, page_size: 1 }))
        .with_index(meili(&server, &config))
        .update_settings(&store)
        .await
        .unwrap();

    assert!(report.all_configured());
    let mut configured = report.configured.clone();
    configured.sort();
    assert_eq!(configured, vec!["digest", "weekly"]);

    // Settings never touch progress
    let sources = SourcesFile::new(dir.path().join("sources.toml"))
        .read_tracked_sources()
        .unwrap();
    let progress: HashMap<_, _> = sources
        .iter()
        .map(|s| (s.key.as_str(), s.current_number))
        .collect();
    assert_eq!(progress["weekly"], 3);
    assert_eq!(progress["digest"], 8);
}
