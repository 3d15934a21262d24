//! Repositories: named sources of artifacts.
//!
//! A repository answers three questions about a [`Dependency`]: is it hosted
//! here, what does it depend on, and what are its bytes. Every backing store
//! implements the [`Repository`] trait; the stock implementation is the
//! coordinate-layout HTTP [`MavenRepository`] with a pluggable
//! [`TransitiveDiscovery`] strategy.
//!
//! # Architecture
//!
//! - [`Repository`] - Async trait that all repositories implement
//! - [`RepositoryManager`] - Alias-keyed registry, first registration wins
//! - [`MavenRepository`] - Generic HTTP repository parameterized by base URL
//! - [`PomDiscovery`] / [`ResourceManifestDiscovery`] - Transitive lookup strategies
//! - [`maven_central`] / [`spigot`] - Named specializations
//!
//! # Example
//!
//! ```no_run
//! use depman_core::dependency::Dependency;
//! use depman_core::repository::{RepositoryHttpConfig, RepositoryManager};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = RepositoryManager::with_default_repositories(&RepositoryHttpConfig::default())?;
//! let central = manager.get_by_name("maven-central").expect("registered by default");
//! let dep = Dependency::new("org.slf4j", "slf4j-api", "2.0.9");
//! println!("hosted: {}", central.contains(&dep).await?);
//! # Ok(())
//! # }
//! ```

mod central;
mod discovery;
mod error;
mod http_client;
mod manager;
mod maven;
mod spigot;

pub use central::{MAVEN_CENTRAL_ALIAS, MAVEN_CENTRAL_URL, maven_central};
pub use discovery::{PomDiscovery, ResourceManifestDiscovery, TransitiveDiscovery, parse_pom};
pub use error::RepositoryError;
pub use http_client::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS, RepositoryHttpConfig,
    build_repository_http_client,
};
pub use manager::RepositoryManager;
pub use maven::MavenRepository;
pub use spigot::{SPIGOT_ALIAS, SPIGOT_URL, spigot};

use std::collections::HashSet;

use async_trait::async_trait;

use crate::dependency::Dependency;

/// Trait that all artifact repositories implement.
///
/// Each operation is independently callable and safe to invoke concurrently
/// for different dependencies. Implementations perform network I/O only;
/// writing artifacts to disk is the engine's job.
///
/// # Object Safety
///
/// This trait uses `async_trait` to support dynamic dispatch via
/// `Arc<dyn Repository>`, which the manager and pinned dependencies hold.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Returns the repository's name (alias or descriptive label).
    fn name(&self) -> &str;

    /// Returns whether this repository hosts `dependency`.
    ///
    /// `Ok(false)` means "definitely not here"; `Err` means the question could
    /// not be answered.
    async fn contains(&self, dependency: &Dependency) -> Result<bool, RepositoryError>;

    /// Returns the declared dependencies of `dependency`.
    ///
    /// An absent descriptor yields an empty set.
    async fn transitive_dependencies(
        &self,
        dependency: &Dependency,
    ) -> Result<HashSet<Dependency>, RepositoryError>;

    /// Fetches the artifact's binary content.
    async fn download_dependency(&self, dependency: &Dependency)
    -> Result<Vec<u8>, RepositoryError>;
}
