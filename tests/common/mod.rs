//! Shared helpers for integration tests
//!
//! A single wiremock server plays every role: content hosts (matched by the
//! host name embedded in the path), the timer decoder at `/timer` and the
//! direct-link delegate at `/direct`.

#![allow(dead_code)]

use std::sync::Arc;

use link_resolver::db::NewTask;
use link_resolver::types::TaskLink;
use link_resolver::{Config, Database, Resolver};
use tempfile::NamedTempFile;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A running API server backed by a temporary task store
pub struct TestServer {
    pub base_url: String,
    pub db: Arc<Database>,
    pub resolver: Resolver,
    stop: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<link_resolver::Result<()>>,
    _db_file: NamedTempFile,
}

impl TestServer {
    /// Start a server whose delegates live on `mocks`
    pub async fn start(mocks: &MockServer) -> Self {
        let db_file = NamedTempFile::new().unwrap();
        let db = Arc::new(Database::new(db_file.path()).await.unwrap());

        let mut config = Config::default();
        config.resolver.timer_endpoint = format!("{}/timer", mocks.uri());
        config.resolver.direct_endpoint = format!("{}/direct", mocks.uri());
        let resolver = Resolver::new(config).unwrap().with_store(db.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let (stop, stopped) = oneshot::channel::<()>();

        let handle = tokio::spawn(link_resolver::api::serve(
            listener,
            resolver.clone(),
            async move {
                let _ = stopped.await;
            },
        ));

        Self {
            base_url,
            db,
            resolver,
            stop: Some(stop),
            handle,
            _db_file: db_file,
        }
    }

    /// POST a batch and return the raw NDJSON body lines
    pub async fn resolve(&self, body: serde_json::Value) -> (reqwest::StatusCode, Vec<String>) {
        let response = reqwest::Client::new()
            .post(format!("{}/api/v1/resolve", self.base_url))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status();
        let text = response.text().await.unwrap();
        (status, text.lines().map(str::to_string).collect())
    }

    /// Seed a task whose links are the given original URLs
    pub async fn seed_task(&self, id: &str, links: &[&str]) {
        let links = links
            .iter()
            .enumerate()
            .map(|(idx, link)| TaskLink {
                name: format!("link {idx}"),
                link: link.to_string(),
                ..Default::default()
            })
            .collect();
        self.db
            .insert_task(&NewTask {
                id: id.to_string(),
                url: "https://source.example/movie".to_string(),
                links,
            })
            .await
            .unwrap();
    }

    /// Stop accepting connections and wait for the server task
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}

/// Mock the timer decoder turning `from` into `to`
pub async fn mount_timer(server: &MockServer, from: &str, to: &str) {
    Mock::given(method("GET"))
        .and(path("/timer"))
        .and(query_param("url", from))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "extracted_link": to
        })))
        .mount(server)
        .await;
}

/// Mock the direct-link delegate resolving `link` to `direct`
pub async fn mount_direct(server: &MockServer, link: &str, direct: &str) {
    Mock::given(method("GET"))
        .and(path("/direct"))
        .and(query_param("url", link))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "best_button_name": "Download [FSL Server]",
            "best_download_link": direct,
            "all_available_buttons": [
                {"button_name": "Download [FSL Server]", "download_link": direct}
            ]
        })))
        .mount(server)
        .await;
}

/// Mock an HTML page at `page_path`
pub async fn mount_page(server: &MockServer, page_path: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(html.to_string()))
        .mount(server)
        .await;
}
