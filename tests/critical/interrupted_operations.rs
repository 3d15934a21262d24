//! Cancellation and timeouts in the middle of a resolution.
//! Assert nothing half-written is left behind and nothing stays in flight.

use std::sync::Arc;
use std::time::Duration;

use depman_core::{
    Dependency, DownloadEngine, EngineOptions, RecordingLoader, Repository, RepositoryManager,
};
use tempfile::TempDir;

use crate::support::critical_utils::file_names;
use crate::support::memory_repository::MemoryRepository;

fn slow_engine(
    delay: Duration,
    timeout: Duration,
    dir: &TempDir,
) -> (DownloadEngine, Arc<RecordingLoader>) {
    let dep = Dependency::new("g", "slow", "1");
    let repo: Arc<dyn Repository> = Arc::new(
        MemoryRepository::new("mem")
            .with_artifact(&dep, &[])
            .with_delay(delay),
    );
    let manager = RepositoryManager::new();
    manager.add_repository("mem", repo);
    let loader = Arc::new(RecordingLoader::new());
    let options = EngineOptions {
        request_timeout: timeout,
        ..EngineOptions::default()
    };
    let engine =
        DownloadEngine::with_options(Arc::new(manager), dir.path(), loader.clone(), options);
    (engine, loader)
}

#[tokio::test]
async fn p0_cancel_mid_resolution_leaves_no_files() {
    let temp = TempDir::new().unwrap();
    let (engine, loader) = slow_engine(
        Duration::from_millis(300),
        Duration::from_secs(5),
        &temp,
    );
    let dep = Dependency::new("g", "slow", "1");

    let handle = engine.download(&dep);
    tokio::time::sleep(Duration::from_millis(50)).await;
    engine.cancel();

    assert!(handle.await.is_none());
    assert!(file_names(engine.libraries_dir()).is_empty());
    assert!(loader.loaded().is_empty());
    assert_eq!(engine.in_flight(), 0);
}

#[tokio::test]
async fn p0_requests_after_cancel_resolve_to_none() {
    let temp = TempDir::new().unwrap();
    let (engine, _loader) = slow_engine(Duration::ZERO, Duration::from_secs(5), &temp);
    engine.cancel();

    let results = futures_util::future::join_all(
        ["a", "b", "c"]
            .into_iter()
            .map(|name| engine.download(&Dependency::new("g", name, "1"))),
    )
    .await;

    assert!(results.iter().all(Option::is_none));
    assert_eq!(engine.in_flight(), 0);
}

#[tokio::test]
async fn p0_timed_out_repository_leaves_no_files() {
    let temp = TempDir::new().unwrap();
    let (engine, _loader) = slow_engine(
        Duration::from_millis(500),
        Duration::from_millis(50),
        &temp,
    );
    let dep = Dependency::new("g", "slow", "1");

    assert!(engine.download_and_load(&dep).await.is_none());
    assert!(file_names(engine.libraries_dir()).is_empty());
}
