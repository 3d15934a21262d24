//! Server errors, rate limiting, refused connections.
//! Assert which failures are retried and that the final outcome is reported.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use depman_core::{
    Dependency, DownloadEngine, EngineOptions, MavenRepository, RecordingLoader,
    RepositoryHttpConfig, RepositoryManager, RetryPolicy,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::critical_utils::FlakyResponder;
use crate::support::socket_guard::{
    artifact_path, mount_present, mount_without_pom, start_mock_server_or_skip,
};

fn widget() -> Dependency {
    Dependency::new("org.example", "widget", "1.0")
}

fn fast_retries(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(
        max_attempts,
        Duration::from_millis(10),
        Duration::from_millis(50),
        2.0,
    )
}

fn engine_for(uri: &str, dir: &TempDir, retry_policy: RetryPolicy) -> DownloadEngine {
    let manager = RepositoryManager::new();
    manager.add_repository(
        "mock",
        Arc::new(MavenRepository::new("mock", uri, &RepositoryHttpConfig::default()).unwrap()),
    );
    let options = EngineOptions {
        retry_policy,
        ..EngineOptions::default()
    };
    DownloadEngine::with_options(
        Arc::new(manager),
        dir.path(),
        Arc::new(RecordingLoader::new()),
        options,
    )
}

async fn mount_present_without_pom(server: &MockServer) -> String {
    mount_present(server, &widget()).await;
    mount_without_pom(server, &widget()).await;
    artifact_path(&widget(), "jar")
}

#[tokio::test]
async fn p0_server_error_503_retried_until_success() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let jar = mount_present_without_pom(&server).await;
    let responder = FlakyResponder::new(2, 503, b"widget");
    let requests = responder.counter();
    Mock::given(method("GET"))
        .and(path(jar))
        .respond_with(responder)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let engine = engine_for(&server.uri(), &temp, fast_retries(3));

    let path = engine.download_and_load(&widget()).await.unwrap();

    assert_eq!(std::fs::read(path).unwrap(), b"widget");
    assert_eq!(requests.load(Ordering::SeqCst), 3);
    assert_eq!(engine.stats().downloaded(), 1);
}

#[tokio::test]
async fn p0_server_error_exhausts_attempts_then_fails() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let jar = mount_present_without_pom(&server).await;
    Mock::given(method("GET"))
        .and(path(jar))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let engine = engine_for(&server.uri(), &temp, fast_retries(2));

    assert!(engine.download_and_load(&widget()).await.is_none());
    assert!(!engine.destination_for(&widget()).exists());
    assert_eq!(engine.stats().failed(), 1);
}

#[tokio::test]
async fn p0_rate_limited_download_is_retried() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let jar = mount_present_without_pom(&server).await;
    Mock::given(method("GET"))
        .and(path(jar))
        .respond_with(FlakyResponder::new(1, 429, b"widget"))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let engine = engine_for(&server.uri(), &temp, fast_retries(3));

    assert!(engine.download_and_load(&widget()).await.is_some());
}

#[tokio::test]
async fn p0_permanent_download_failure_is_not_retried() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let jar = mount_present_without_pom(&server).await;
    Mock::given(method("GET"))
        .and(path(jar))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let engine = engine_for(&server.uri(), &temp, fast_retries(3));

    assert!(engine.download_and_load(&widget()).await.is_none());
    assert_eq!(engine.stats().failed(), 1);
}

#[tokio::test]
async fn p0_connection_refused_reports_not_found() {
    // Nothing listens on the discard port; every check fails at connect time.
    let temp = TempDir::new().unwrap();
    let engine = engine_for("http://127.0.0.1:9", &temp, fast_retries(2));

    assert!(engine.download_and_load(&widget()).await.is_none());
    assert_eq!(engine.stats().not_found(), 1);
    assert_eq!(engine.in_flight(), 0);
}
