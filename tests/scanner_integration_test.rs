// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use axum::http::header::{HeaderName, CONTENT_TYPE, SERVER};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use fingerprobe::models::crawler::TaskKind;
use fingerprobe::models::scan::ScanReport;
use fingerprobe::models::settings::{OutputMode, ScanConfig};
use fingerprobe::services::crawler::Fetcher;
use fingerprobe::services::rules::FingerprintDatabase;
use fingerprobe::services::scanner::Scanner;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

// Integration tests for the scan pipeline
// A local axum server plays the part of the scanned web applications

const FINGER_JSON: &str = r#"{"fingerprint":[
    {"cms":"tomcat","method":"keyword","location":"title","keyword":["Tomcat"]},
    {"cms":"coyote","method":"keyword","location":"header","keyword":["Apache-Coyote"]},
    {"cms":"iconapp","method":"faviconhash","location":"body","keyword":["1155597304"]}
]}"#;

const ARL_YAML: &str = r#"
- name: WordPress_body
  rule: 'body="wp-content" && header="x-powered-by: php"'
- name: Never_title
  rule: title="this title does not exist"
"#;

async fn tomcat() -> impl IntoResponse {
    (
        [(SERVER, "Apache-Coyote/1.1")],
        Html("<html><head><title>Apache Tomcat/9.0.1</title></head><body>ok</body></html>"),
    )
}

async fn wordpress() -> impl IntoResponse {
    (
        [(HeaderName::from_static("x-powered-by"), "PHP/8.1")],
        Html(r#"<html><head><title>Blog</title><link href="/wp-content/style.css"></head></html>"#),
    )
}

async fn wordpress_without_header() -> Html<&'static str> {
    Html(r#"<html><head><title>Blog</title><link href="/wp-content/style.css"></head></html>"#)
}

async fn jump() -> Html<&'static str> {
    Html(r#"<html><script>window.location.href = "landing";</script></html>"#)
}

async fn landing() -> Html<&'static str> {
    Html(r#"<html><title>Landing</title><script>top.location.href = "deeper";</script></html>"#)
}

async fn icon_page() -> Html<&'static str> {
    Html(r#"<html><head><link rel="icon" href="/static/icon.png"><title>Icons</title></head></html>"#)
}

async fn icon_bytes() -> impl IntoResponse {
    ([(CONTENT_TYPE, "image/png")], b"hello".to_vec())
}

async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route("/tomcat", get(tomcat))
        .route("/wp", get(wordpress))
        .route("/wp-plain", get(wordpress_without_header))
        .route("/jump", get(jump))
        .route("/jump/landing", get(landing))
        .route("/icon", get(icon_page))
        .route("/static/icon.png", get(icon_bytes));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to read local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });
    addr
}

fn load_database() -> FingerprintDatabase {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let finger = dir.path().join("finger.json");
    let arl = dir.path().join("finger.yaml");
    std::fs::write(&finger, FINGER_JSON).expect("Failed to write finger.json");
    std::fs::write(&arl, ARL_YAML).expect("Failed to write finger.yaml");
    FingerprintDatabase::load_all(&[finger, arl]).expect("Failed to load fingerprints")
}

async fn scan(targets: Vec<String>) -> ScanReport {
    let config = ScanConfig::default()
        .with_threads(4)
        .with_timeout(Duration::from_secs(5))
        .with_output_mode(OutputMode::Silent);
    let scanner = Scanner::new(config, Arc::new(load_database()), targets)
        .expect("Failed to build scanner");

    tokio::time::timeout(Duration::from_secs(30), Arc::new(scanner).run())
        .await
        .expect("Scan did not finish")
}

#[tokio::test]
async fn test_tomcat_title_and_header_rules() {
    let addr = spawn_server().await;
    let url = format!("http://{}/tomcat", addr);

    let report = scan(vec![url.clone()]).await;

    let result = report.find(&url).expect("tomcat page should be recorded");
    assert_eq!(result.status_code, 200);
    assert_eq!(result.server, "Apache-Coyote/1.1");
    assert_eq!(result.title, "Apache Tomcat/9.0.1");
    assert_eq!(result.matched_names(), vec!["tomcat", "coyote"]);
    assert_eq!(report.hits.len(), 1);
}

#[tokio::test]
async fn test_rule_string_requires_every_clause() {
    let addr = spawn_server().await;
    let with_header = format!("http://{}/wp", addr);
    let without_header = format!("http://{}/wp-plain", addr);

    let report = scan(vec![with_header.clone(), without_header.clone()]).await;

    assert_eq!(report.all.len(), 2);
    assert_eq!(report.find(&with_header).unwrap().cms, "WordPress");
    assert_eq!(report.find(&without_header).unwrap().cms, "");
    assert_eq!(report.hits.len(), 1);
    assert_eq!(report.hits[0].url, with_header);
}

#[tokio::test]
async fn test_redirect_expansion_stops_after_one_level() {
    let addr = spawn_server().await;
    let jump = format!("http://{}/jump", addr);
    let landing = format!("http://{}/jump/landing", addr);

    let report = scan(vec![jump.clone()]).await;

    let urls: Vec<&str> = report.all.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls.len(), 2, "unexpected results: {:?}", urls);
    assert!(report.find(&jump).is_some());
    assert_eq!(report.find(&landing).unwrap().title, "Landing");
    assert!(urls.iter().all(|u| !u.contains("deeper")));
}

#[tokio::test]
async fn test_favicon_hash_rule_matches() {
    let addr = spawn_server().await;
    let url = format!("http://{}/icon", addr);

    let report = scan(vec![url.clone()]).await;

    assert_eq!(report.find(&url).unwrap().cms, "iconapp");
}

#[tokio::test]
async fn test_https_falls_back_to_http() {
    let addr = spawn_server().await;

    let report = scan(vec![format!("https://{}/tomcat", addr)]).await;

    assert_eq!(report.all.len(), 1);
    assert_eq!(report.all[0].url, format!("http://{}/tomcat", addr));
    assert!(report.all[0].is_hit());
}

#[tokio::test]
async fn test_unreachable_target_is_dropped() {
    let addr = spawn_server().await;
    let reachable = format!("http://{}/tomcat", addr);

    let report = scan(vec![
        "https://127.0.0.1:1".to_string(),
        reachable.clone(),
    ])
    .await;

    assert_eq!(report.all.len(), 1);
    assert_eq!(report.all[0].url, reachable);
    assert!(report.hits.iter().all(|r| !r.url.contains(":1/")));
}

#[tokio::test]
async fn test_fetcher_records_raw_response_and_any_status() {
    let addr = spawn_server().await;
    let fetcher = Fetcher::new(&ScanConfig::default()).unwrap();

    let missing = fetcher
        .fetch(&format!("http://{}/nope", addr), TaskKind::Primary)
        .await
        .expect("404 is still a response");
    assert_eq!(missing.status_code, 404);

    let page = fetcher
        .fetch(&format!("http://{}/tomcat", addr), TaskKind::Primary)
        .await
        .unwrap();
    let raw = String::from_utf8_lossy(&page.raw);
    assert!(raw.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(raw.contains("Server: Apache-Coyote/1.1\r\n"));
    assert!(raw.ends_with("</html>"));
    assert_eq!(page.length, page.body.len());
    assert_eq!(page.header("server"), Some("Apache-Coyote/1.1"));
}

#[tokio::test]
async fn test_derived_fetch_skips_redirect_discovery() {
    let addr = spawn_server().await;
    let fetcher = Fetcher::new(&ScanConfig::default()).unwrap();
    let url = format!("http://{}/jump", addr);

    let primary = fetcher.fetch(&url, TaskKind::Primary).await.unwrap();
    assert_eq!(
        primary.redirect_targets,
        vec![format!("http://{}/jump/landing", addr)]
    );

    let derived = fetcher.fetch(&url, TaskKind::Derived).await.unwrap();
    assert!(derived.redirect_targets.is_empty());
}
