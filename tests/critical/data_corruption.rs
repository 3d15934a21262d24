//! Damaged local state: corrupt manifests, stray temporary files, foreign files.
//! Assert resolution recovers without clobbering good artifacts.

use std::sync::Arc;

use depman_core::download::manifest::{manifest_path, read_manifest};
use depman_core::{Dependency, DownloadEngine, RecordingLoader, Repository, RepositoryManager};
use tempfile::TempDir;

use crate::support::critical_utils::{artifact_with_corrupt_manifest, file_names};
use crate::support::memory_repository::MemoryRepository;

fn engine_over(
    repo: &Arc<MemoryRepository>,
    dir: &TempDir,
) -> (DownloadEngine, Arc<RecordingLoader>) {
    let manager = RepositoryManager::new();
    let repo: Arc<dyn Repository> = repo.clone();
    manager.add_repository("mem", repo);
    let loader = Arc::new(RecordingLoader::new());
    let engine = DownloadEngine::new(Arc::new(manager), dir.path(), loader.clone());
    (engine, loader)
}

#[tokio::test]
async fn p0_corrupt_manifest_falls_back_to_repository() {
    let parent = Dependency::new("g", "parent", "1");
    let child = Dependency::new("g", "child", "1");
    let repo = Arc::new(
        MemoryRepository::new("mem")
            .with_artifact(&parent, std::slice::from_ref(&child))
            .with_artifact(&child, &[]),
    );
    let temp = TempDir::new().unwrap();
    let (engine, loader) = engine_over(&repo, &temp);
    let artifact = engine.destination_for(&parent);
    artifact_with_corrupt_manifest(&artifact, b"kept");

    assert!(engine.download_and_load(&parent).await.is_some());

    // The artifact on disk is reused; only the child is fetched.
    assert_eq!(std::fs::read(&artifact).unwrap(), b"kept");
    assert_eq!(repo.download_calls(), 1);
    assert_eq!(loader.loaded(), vec![child.clone(), parent.clone()]);
    assert_eq!(read_manifest(&artifact).await, Some(vec![child]));
}

#[tokio::test]
async fn p0_manifest_without_artifact_is_ignored() {
    let dep = Dependency::new("g", "lonely", "1");
    let repo = Arc::new(MemoryRepository::new("mem").with_artifact(&dep, &[]));
    let temp = TempDir::new().unwrap();
    let (engine, _loader) = engine_over(&repo, &temp);
    let artifact = engine.destination_for(&dep);
    std::fs::create_dir_all(artifact.parent().unwrap()).unwrap();
    std::fs::write(manifest_path(&artifact), br#"{"dependencies":[]}"#).unwrap();

    assert!(engine.download_and_load(&dep).await.is_some());
    assert_eq!(repo.download_calls(), 1);
    assert_eq!(std::fs::read(&artifact).unwrap(), b"g:lonely:1@mem");
}

#[tokio::test]
async fn p0_stale_temporary_files_do_not_block_resolution() {
    let dep = Dependency::new("g", "a", "1");
    let repo = Arc::new(MemoryRepository::new("mem").with_artifact(&dep, &[]));
    let temp = TempDir::new().unwrap();
    let (engine, _loader) = engine_over(&repo, &temp);
    let libraries = engine.libraries_dir().to_path_buf();
    std::fs::create_dir_all(&libraries).unwrap();
    std::fs::write(libraries.join(".a-1.jar.1.0.deadbeef.part"), b"half").unwrap();

    let path = engine.download_and_load(&dep).await.unwrap();

    assert_eq!(std::fs::read(path).unwrap(), b"g:a:1@mem");
    assert!(file_names(&libraries).contains(&"a-1.jar".to_string()));
}

#[tokio::test]
async fn p0_unrelated_files_are_left_alone() {
    let dep = Dependency::new("g", "a", "1");
    let repo = Arc::new(MemoryRepository::new("mem").with_artifact(&dep, &[]));
    let temp = TempDir::new().unwrap();
    let (engine, _loader) = engine_over(&repo, &temp);
    let libraries = engine.libraries_dir().to_path_buf();
    std::fs::create_dir_all(&libraries).unwrap();
    std::fs::write(libraries.join("notes.txt"), b"mine").unwrap();

    engine.download_and_load(&dep).await.unwrap();

    assert_eq!(std::fs::read(libraries.join("notes.txt")).unwrap(), b"mine");
    assert_eq!(
        file_names(&libraries),
        vec!["a-1.jar", "a-1.jar.deps.json", "notes.txt"]
    );
}
