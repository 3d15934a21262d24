//! Top-level entry point: the set of required dependencies and one call that
//! resolves them all.

use std::path::PathBuf;
use std::time::Instant;

use futures_util::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::config::{DependenciesConfig, ResourceProvider};
use crate::dependency::Dependency;
use crate::download::DownloadEngine;
use crate::repository::RepositoryHttpConfig;

/// Outcome of [`DependencyCoordinator::load_all_dependencies`].
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    loaded: Vec<(Dependency, PathBuf)>,
    missing: Vec<Dependency>,
}

impl LoadReport {
    /// Required dependencies that resolved, with their paths.
    #[must_use]
    pub fn loaded(&self) -> &[(Dependency, PathBuf)] {
        &self.loaded
    }

    /// Required dependencies that did not resolve.
    #[must_use]
    pub fn missing(&self) -> &[Dependency] {
        &self.missing
    }

    /// Number of required dependencies that resolved.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.loaded.len()
    }

    /// Number of required dependencies that did not resolve.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.missing.len()
    }

    /// Number of required dependencies processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.completed() + self.failed()
    }

    /// Returns true when every required dependency resolved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Owns the required dependency set and drives the engine over it.
#[derive(Debug)]
pub struct DependencyCoordinator {
    engine: DownloadEngine,
    required: Vec<Dependency>,
}

impl DependencyCoordinator {
    /// Creates a coordinator with nothing required.
    #[must_use]
    pub fn new(engine: DownloadEngine) -> Self {
        Self {
            engine,
            required: Vec::new(),
        }
    }

    /// Reads `dependencies.json` from `provider` and requires what it lists.
    ///
    /// Repositories named in the document are registered on the engine's
    /// manager first, so declarations can pin to them. An absent or invalid
    /// document leaves the coordinator with nothing to resolve.
    #[instrument(skip_all)]
    pub fn from_resources(
        engine: DownloadEngine,
        provider: &dyn ResourceProvider,
        http_config: &RepositoryHttpConfig,
    ) -> Self {
        let mut coordinator = Self::new(engine);
        let Some(config) = DependenciesConfig::load(provider) else {
            return coordinator;
        };

        let manager = coordinator.engine.repositories();
        let added = config.register_repositories(manager, http_config);
        debug!(added, "Registered configured repositories");

        for dependency in config.dependencies(manager) {
            coordinator.add_required_dependency(dependency);
        }
        coordinator
    }

    /// Adds `dependency` to the required set.
    ///
    /// Returns `false` if the same coordinates were already required; the
    /// first declaration (and its pin) is kept.
    pub fn add_required_dependency(&mut self, dependency: Dependency) -> bool {
        if self.required.contains(&dependency) {
            debug!(dependency = %dependency, "Dependency already required");
            return false;
        }
        self.required.push(dependency);
        true
    }

    /// Required dependencies in declaration order.
    #[must_use]
    pub fn required(&self) -> &[Dependency] {
        &self.required
    }

    /// The engine this coordinator drives.
    #[must_use]
    pub fn engine(&self) -> &DownloadEngine {
        &self.engine
    }

    /// Resolves every required dependency in parallel and waits for all.
    ///
    /// Missing dependencies are reported, never raised; one failure does not
    /// affect the others.
    pub async fn load_all_dependencies(&self) -> LoadReport {
        info!("Loading dependencies, please wait...");
        let started = Instant::now();

        let outcomes = join_all(self.required.iter().map(|dependency| async move {
            let path = self.engine.download_and_load(dependency).await;
            (dependency.clone(), path)
        }))
        .await;

        let mut report = LoadReport::default();
        for (dependency, path) in outcomes {
            match path {
                Some(path) => report.loaded.push((dependency, path)),
                None => report.missing.push(dependency),
            }
        }

        for dependency in &report.missing {
            warn!(dependency = %dependency, "Required dependency is unavailable");
        }
        info!(
            completed = report.completed(),
            failed = report.failed(),
            total = report.total(),
            elapsed_ms = started.elapsed().as_millis(),
            "Loaded dependencies"
        );
        report
    }
}
