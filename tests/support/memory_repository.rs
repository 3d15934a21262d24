use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use depman_core::{Dependency, Repository, RepositoryError};

/// In-memory repository that counts every call it receives.
pub struct MemoryRepository {
    name: String,
    artifacts: HashMap<Dependency, HashSet<Dependency>>,
    delay: Duration,
    contains_calls: AtomicUsize,
    transitive_calls: AtomicUsize,
    download_calls: AtomicUsize,
}

impl MemoryRepository {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            artifacts: HashMap::new(),
            delay: Duration::ZERO,
            contains_calls: AtomicUsize::new(0),
            transitive_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
        }
    }

    /// Hosts `dependency` with the given direct children.
    pub fn with_artifact(mut self, dependency: &Dependency, children: &[Dependency]) -> Self {
        self.artifacts
            .insert(dependency.clone(), children.iter().cloned().collect());
        self
    }

    /// Delays every answer, to keep concurrent callers overlapping.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn contains_calls(&self) -> usize {
        self.contains_calls.load(Ordering::SeqCst)
    }

    pub fn transitive_calls(&self) -> usize {
        self.transitive_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.contains_calls() + self.transitive_calls() + self.download_calls()
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    fn name(&self) -> &str {
        &self.name
    }

    async fn contains(&self, dependency: &Dependency) -> Result<bool, RepositoryError> {
        self.contains_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        Ok(self.artifacts.contains_key(dependency))
    }

    async fn transitive_dependencies(
        &self,
        dependency: &Dependency,
    ) -> Result<HashSet<Dependency>, RepositoryError> {
        self.transitive_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        Ok(self.artifacts.get(dependency).cloned().unwrap_or_default())
    }

    async fn download_dependency(&self, dependency: &Dependency) -> Result<Vec<u8>, RepositoryError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.artifacts.contains_key(dependency) {
            Ok(format!("{}@{}", dependency.coordinates(), self.name).into_bytes())
        } else {
            Err(RepositoryError::http_status(self.name.clone(), 404))
        }
    }
}

/// Repository that fails every call at the transport level.
pub struct BrokenRepository;

#[async_trait]
impl Repository for BrokenRepository {
    fn name(&self) -> &str {
        "broken"
    }

    async fn contains(&self, _dependency: &Dependency) -> Result<bool, RepositoryError> {
        Err(RepositoryError::timeout("broken"))
    }

    async fn transitive_dependencies(
        &self,
        _dependency: &Dependency,
    ) -> Result<HashSet<Dependency>, RepositoryError> {
        Err(RepositoryError::timeout("broken"))
    }

    async fn download_dependency(&self, _dependency: &Dependency) -> Result<Vec<u8>, RepositoryError> {
        Err(RepositoryError::timeout("broken"))
    }
}
