//! Resolution engine: dedup, containment race, transitive closure, atomic
//! materialization.
//!
//! # Overview
//!
//! [`DownloadEngine::download_and_load`] drives one dependency through its
//! pipeline:
//!
//! 1. Join the running pipeline for the same coordinates, or start one.
//! 2. Pick candidates: the pinned repository alone, else every registered one.
//!    A materialized artifact with a stored manifest skips straight to step 4
//!    without contacting any repository.
//! 3. Race `contains` across the candidates; the first yes wins.
//! 4. Resolve every transitive dependency through its own pipeline and wait
//!    for all of them.
//! 5. Download (with retry) and write the artifact atomically unless it is
//!    already on disk, then store the manifest.
//! 6. Hand the file to the [`DependencyLoader`], once per coordinates for the
//!    lifetime of the engine.
//!
//! Every failure is soft: the pipeline resolves to `None` and logs why.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use depman_core::dependency::Dependency;
//! use depman_core::download::{DownloadEngine, LoggingLoader};
//! use depman_core::repository::{RepositoryHttpConfig, RepositoryManager};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repositories = RepositoryManager::with_default_repositories(&RepositoryHttpConfig::default())?;
//! let engine = DownloadEngine::new(Arc::new(repositories), "./libraries", Arc::new(LoggingLoader));
//! let path = engine
//!     .download_and_load(&Dependency::new("org.slf4j", "slf4j-api", "2.0.9"))
//!     .await;
//! println!("{path:?}");
//! # Ok(())
//! # }
//! ```

mod materialize;
mod race;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::DashSet;
use futures_util::FutureExt;
use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use self::race::RaceOutcome;
use super::atomic::write_atomic;
use super::error::EngineError;
use super::ledger::{InFlightLedger, ResolutionHandle};
use super::loader::DependencyLoader;
use super::manifest::{read_manifest, write_manifest};
use super::retry::RetryPolicy;
use super::waits::WaitGraph;
use crate::dependency::Dependency;
use crate::repository::{DEFAULT_READ_TIMEOUT_SECS, Repository, RepositoryError, RepositoryManager};

/// Directory name used for materialized artifacts next to the data directory.
pub const LIBRARIES_DIR_NAME: &str = "libraries";

/// Default libraries directory for a host data directory: its sibling
/// `libraries` directory.
#[must_use]
pub fn libraries_dir_for(data_dir: &Path) -> PathBuf {
    data_dir
        .parent()
        .unwrap_or(data_dir)
        .join(LIBRARIES_DIR_NAME)
}

/// Tunables for one engine.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Upper bound on any single repository call.
    pub request_timeout: Duration,
    /// Retry policy for artifact downloads.
    pub retry_policy: RetryPolicy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            retry_policy: RetryPolicy::default(),
        }
    }
}

/// Outcome counters for one engine.
///
/// Uses atomic counters for thread-safe updates from concurrent pipelines.
#[derive(Debug, Default)]
pub struct EngineStats {
    downloaded: AtomicUsize,
    reused: AtomicUsize,
    not_found: AtomicUsize,
    failed: AtomicUsize,
}

impl EngineStats {
    /// Artifacts fetched from a repository and written to disk.
    #[must_use]
    pub fn downloaded(&self) -> usize {
        self.downloaded.load(Ordering::SeqCst)
    }

    /// Artifacts that were already on disk.
    #[must_use]
    pub fn reused(&self) -> usize {
        self.reused.load(Ordering::SeqCst)
    }

    /// Dependencies no candidate repository hosted.
    #[must_use]
    pub fn not_found(&self) -> usize {
        self.not_found.load(Ordering::SeqCst)
    }

    /// Download, write, or cancellation failures.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    fn increment(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

/// Why a single repository call produced no answer.
pub(crate) enum CallFailure {
    /// The engine's token fired first.
    Cancelled,
    /// The repository failed or the call timed out.
    Repository(RepositoryError),
}

/// Timeout and cancellation applied to every repository call.
#[derive(Clone)]
pub(crate) struct CallLimits {
    timeout: Duration,
    token: CancellationToken,
}

impl CallLimits {
    async fn run<T, F>(
        &self,
        dependency: &Dependency,
        repository: &str,
        operation: &'static str,
        call: F,
    ) -> Result<T, CallFailure>
    where
        F: Future<Output = Result<T, RepositoryError>>,
    {
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(CallFailure::Cancelled),
            outcome = tokio::time::timeout(self.timeout, call) => match outcome {
                Ok(result) => result.map_err(CallFailure::Repository),
                Err(_) => Err(CallFailure::Repository(RepositoryError::timeout(format!(
                    "{repository} {operation} {dependency}"
                )))),
            },
        }
    }
}

struct Inner {
    repositories: Arc<RepositoryManager>,
    libraries_dir: PathBuf,
    ledger: InFlightLedger,
    waits: WaitGraph,
    loader: Arc<dyn DependencyLoader>,
    loaded: DashSet<Dependency>,
    options: EngineOptions,
    token: CancellationToken,
    stats: EngineStats,
}

/// Removes the ledger entry and any wait edges when the pipeline task ends,
/// even by panic.
struct LedgerGuard {
    inner: Arc<Inner>,
    dependency: Dependency,
}

impl Drop for LedgerGuard {
    fn drop(&mut self) {
        self.inner.waits.release(&self.dependency);
        self.inner.ledger.complete(&self.dependency);
    }
}

/// Resolves dependencies into the libraries directory. Cheap to clone.
#[derive(Clone)]
pub struct DownloadEngine {
    inner: Arc<Inner>,
}

impl DownloadEngine {
    /// Creates an engine with default options.
    #[must_use]
    pub fn new(
        repositories: Arc<RepositoryManager>,
        libraries_dir: impl Into<PathBuf>,
        loader: Arc<dyn DependencyLoader>,
    ) -> Self {
        Self::with_options(repositories, libraries_dir, loader, EngineOptions::default())
    }

    /// Creates an engine with explicit options.
    #[must_use]
    pub fn with_options(
        repositories: Arc<RepositoryManager>,
        libraries_dir: impl Into<PathBuf>,
        loader: Arc<dyn DependencyLoader>,
        options: EngineOptions,
    ) -> Self {
        let libraries_dir = libraries_dir.into();
        debug!(
            libraries_dir = %libraries_dir.display(),
            repositories = repositories.len(),
            request_timeout_ms = options.request_timeout.as_millis(),
            max_attempts = options.retry_policy.max_attempts(),
            "creating download engine"
        );
        Self {
            inner: Arc::new(Inner {
                repositories,
                libraries_dir,
                ledger: InFlightLedger::new(),
                waits: WaitGraph::new(),
                loader,
                loaded: DashSet::new(),
                options,
                token: CancellationToken::new(),
                stats: EngineStats::default(),
            }),
        }
    }

    /// Repositories this engine consults.
    #[must_use]
    pub fn repositories(&self) -> &Arc<RepositoryManager> {
        &self.inner.repositories
    }

    /// Directory artifacts are written to.
    #[must_use]
    pub fn libraries_dir(&self) -> &Path {
        &self.inner.libraries_dir
    }

    /// Options this engine was built with.
    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.inner.options
    }

    /// Outcome counters since creation.
    #[must_use]
    pub fn stats(&self) -> &EngineStats {
        &self.inner.stats
    }

    /// Where `dependency` is (or will be) materialized.
    #[must_use]
    pub fn destination_for(&self, dependency: &Dependency) -> PathBuf {
        self.inner.libraries_dir.join(dependency.file_name())
    }

    /// Number of pipelines currently running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inner.ledger.len()
    }

    /// Cancels every running and future pipeline of this engine.
    pub fn cancel(&self) {
        info!("Cancelling dependency resolution");
        self.inner.token.cancel();
    }

    /// Token that cancels this engine when fired.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    /// Resolves `dependency` and its transitive closure, loads it, and waits
    /// for the outcome.
    ///
    /// Same pipeline as [`download`](Self::download); this is the awaited
    /// form. Returns `None` when the dependency could not be resolved; the
    /// reason is logged.
    #[instrument(skip_all, fields(dependency = %dependency))]
    pub async fn download_and_load(&self, dependency: &Dependency) -> Option<PathBuf> {
        self.download(dependency).await
    }

    /// Starts (or joins) `dependency`'s pipeline and returns its shared
    /// handle without waiting.
    ///
    /// The pipeline, loader call included, runs on its own task whether or
    /// not the handle is polled. Concurrent calls for the same coordinates
    /// share one pipeline and observe the same result.
    #[must_use]
    pub fn download(&self, dependency: &Dependency) -> ResolutionHandle {
        self.start(dependency)
    }

    fn start(&self, dependency: &Dependency) -> ResolutionHandle {
        let (handle, _) = self.inner.ledger.get_or_start(dependency, || {
            let engine = self.clone();
            let dependency = dependency.clone();
            let task = tokio::spawn(async move {
                let _guard = LedgerGuard {
                    inner: Arc::clone(&engine.inner),
                    dependency: dependency.clone(),
                };
                engine.run_pipeline(&dependency).await
            });
            async move { task.await.ok().flatten() }.boxed()
        });
        handle
    }

    #[instrument(skip_all, fields(dependency = %dependency))]
    async fn run_pipeline(&self, dependency: &Dependency) -> Option<PathBuf> {
        let destination = self.destination_for(dependency);

        match self.resolve(dependency, &destination).await {
            Ok(()) => {
                self.load_once(dependency, &destination);
                Some(destination)
            }
            Err(error) => {
                let stats = &self.inner.stats;
                match &error {
                    EngineError::NotFound { .. } => {
                        EngineStats::increment(&stats.not_found);
                        warn!(dependency = %dependency, error = %error, "Could not find dependency");
                    }
                    EngineError::Cancelled { .. } => {
                        EngineStats::increment(&stats.failed);
                        info!(dependency = %dependency, "Resolution cancelled");
                    }
                    EngineError::Download { .. }
                    | EngineError::Materialize { .. }
                    | EngineError::UnsafeCoordinates { .. } => {
                        EngineStats::increment(&stats.failed);
                        error!(dependency = %dependency, error = %error, "Could not resolve dependency");
                    }
                }
                None
            }
        }
    }

    /// Hands `destination` to the loader unless this engine already loaded
    /// the same coordinates.
    fn load_once(&self, dependency: &Dependency, destination: &Path) {
        if !self.inner.loaded.insert(dependency.clone()) {
            debug!(dependency = %dependency, "Already loaded");
            return;
        }
        if let Err(error) = self.inner.loader.load(dependency, destination) {
            // Not loaded after all; a later pipeline may try again.
            self.inner.loaded.remove(dependency);
            error!(dependency = %dependency, error = %error, "Could not load dependency");
        }
    }

    async fn resolve(&self, dependency: &Dependency, destination: &Path) -> Result<(), EngineError> {
        if self.inner.token.is_cancelled() {
            return Err(EngineError::cancelled(dependency));
        }
        if !dependency.is_path_safe() || destination.parent() != Some(self.libraries_dir()) {
            return Err(EngineError::unsafe_coordinates(dependency));
        }

        let already_present = file_exists(destination).await;
        if already_present {
            if let Some(children) = read_manifest(destination).await {
                debug!(dependency = %dependency, "Already materialized");
                self.resolve_children(dependency, children).await;
                EngineStats::increment(&self.inner.stats.reused);
                return Ok(());
            }
        }

        let candidates = self.candidates(dependency);
        let candidate_count = candidates.len();
        let limits = self.call_limits();

        let host = match race::find_host(candidates, dependency, &limits).await {
            RaceOutcome::Found(host) => host,
            RaceOutcome::NotFound => {
                return Err(EngineError::not_found(dependency, candidate_count));
            }
            RaceOutcome::Cancelled => return Err(EngineError::cancelled(dependency)),
        };

        let transitives = match limits
            .run(
                dependency,
                host.name(),
                "transitive_dependencies",
                host.transitive_dependencies(dependency),
            )
            .await
        {
            Ok(found) => Some(found),
            Err(CallFailure::Cancelled) => return Err(EngineError::cancelled(dependency)),
            Err(CallFailure::Repository(error)) => {
                warn!(
                    dependency = %dependency,
                    repository = host.name(),
                    error = %error,
                    "Could not list transitive dependencies, continuing without them"
                );
                None
            }
        };

        let children = transitives.iter().flatten().cloned().collect();
        self.resolve_children(dependency, children).await;

        if already_present || file_exists(destination).await {
            EngineStats::increment(&self.inner.stats.reused);
        } else {
            let bytes = materialize::fetch_with_retry(
                &host,
                dependency,
                &limits,
                &self.inner.options.retry_policy,
            )
            .await?;
            write_atomic(destination, &bytes)
                .await
                .map_err(|e| EngineError::materialize(dependency, e))?;
            EngineStats::increment(&self.inner.stats.downloaded);
            info!(
                dependency = %dependency,
                repository = host.name(),
                bytes = bytes.len(),
                "Downloaded dependency"
            );
        }

        // An unknown transitive set is not recorded, so the next run asks again.
        if let Some(transitives) = transitives {
            if let Err(error) = write_manifest(destination, &transitives).await {
                warn!(dependency = %dependency, error = %error, "Could not store manifest");
            }
        }
        Ok(())
    }

    /// Runs every child's pipeline concurrently and waits for all of them.
    ///
    /// A child whose running pipeline already waits on `parent`, directly or
    /// through other pipelines, closes a cycle and is skipped.
    async fn resolve_children(&self, parent: &Dependency, children: Vec<Dependency>) {
        if children.is_empty() {
            return;
        }

        let (admitted, refused) = self.inner.waits.admit(parent, children);
        for child in &refused {
            warn!(parent = %parent, dependency = %child, "Skipping dependency cycle");
        }

        let waits = admitted.into_iter().map(|child| {
            let handle = self.start(&child);
            let inner = Arc::clone(&self.inner);
            let parent = parent.clone();
            async move {
                let outcome = handle.await;
                inner.waits.finished_waiting(&parent, &child);
                outcome
            }
        });
        let waits: Vec<_> = waits.collect();

        debug!(parent = %parent, count = waits.len(), "Waiting for transitive dependencies");
        join_all(waits).await;
    }

    fn candidates(&self, dependency: &Dependency) -> Vec<Arc<dyn Repository>> {
        match dependency.source_repository() {
            Some(pinned) => vec![Arc::clone(pinned)],
            None => self.inner.repositories.repositories(),
        }
    }

    fn call_limits(&self) -> CallLimits {
        CallLimits {
            timeout: self.inner.options.request_timeout,
            token: self.inner.token.clone(),
        }
    }
}

impl std::fmt::Debug for DownloadEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadEngine")
            .field("libraries_dir", &self.inner.libraries_dir)
            .field("repositories", &self.inner.repositories)
            .field("in_flight", &self.in_flight())
            .field("waiting", &self.inner.waits.waiting())
            .field("loaded", &self.inner.loaded.len())
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
