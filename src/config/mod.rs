//! Dependency configuration and the resource provider it is read from.
//!
//! The host supplies a `dependencies.json` document through a
//! [`ResourceProvider`]:
//!
//! ```json
//! {
//!   "repositories": { "papermc": "https://repo.papermc.io/repository/maven-public/" },
//!   "dependencies": [
//!     { "groupId": "org.slf4j", "artifactId": "slf4j-api", "version": "2.0.9" },
//!     { "groupId": "io.papermc", "artifactId": "paperlib", "version": "1.0.8",
//!       "sourceRepository": "papermc" }
//!   ]
//! }
//! ```
//!
//! A missing document is not an error; there is simply nothing to resolve.

mod error;

pub use error::ConfigError;

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dependency::{Dependency, check_coordinate_part};
use crate::repository::{MavenRepository, RepositoryHttpConfig, RepositoryManager};

/// Well-known resource name of the dependency configuration.
pub const DEPENDENCIES_RESOURCE: &str = "dependencies.json";

/// Host-side blob lookup keyed by file name.
pub trait ResourceProvider: Send + Sync {
    /// Returns the resource's bytes, or `None` when it does not exist.
    fn resource(&self, name: &str) -> Option<Vec<u8>>;
}

impl ResourceProvider for HashMap<String, Vec<u8>> {
    fn resource(&self, name: &str) -> Option<Vec<u8>> {
        self.get(name).cloned()
    }
}

/// Serves resources from files in one directory.
#[derive(Debug, Clone)]
pub struct DirectoryResources {
    root: PathBuf,
}

impl DirectoryResources {
    /// Creates a provider rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory resources are read from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, ConfigError> {
        let path = self.root.join(name);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ConfigError::io(path, err)),
        }
    }
}

impl ResourceProvider for DirectoryResources {
    fn resource(&self, name: &str) -> Option<Vec<u8>> {
        match self.read(name) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(error = %error, "Could not read resource");
                None
            }
        }
    }
}

/// One declared dependency as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyDeclaration {
    /// Group identifier.
    pub group_id: String,
    /// Artifact identifier.
    pub artifact_id: String,
    /// Exact version.
    pub version: String,
    /// Alias of the repository this dependency must come from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_repository: Option<String>,
}

impl DependencyDeclaration {
    /// Creates a declaration from a dependency's coordinates (pin dropped).
    #[must_use]
    pub fn from_dependency(dependency: &Dependency) -> Self {
        Self {
            group_id: dependency.group_id().to_string(),
            artifact_id: dependency.artifact_id().to_string(),
            version: dependency.version().to_string(),
            source_repository: None,
        }
    }

    /// Converts to a dependency ignoring any source repository.
    #[must_use]
    pub fn to_unpinned_dependency(&self) -> Dependency {
        Dependency::new(
            self.group_id.trim(),
            self.artifact_id.trim(),
            self.version.trim(),
        )
    }

    /// Converts to a dependency, pinning it when the alias is registered.
    ///
    /// An unknown alias is logged and the dependency is left unpinned.
    #[must_use]
    pub fn to_dependency(&self, manager: &RepositoryManager) -> Dependency {
        let dependency = self.to_unpinned_dependency();
        let Some(alias) = self.source_repository.as_deref() else {
            return dependency;
        };
        match manager.get_by_name(alias) {
            Some(repository) => dependency.pinned_to(repository),
            None => {
                warn!(
                    dependency = %dependency,
                    alias,
                    "Configured source repository is not registered; searching all repositories"
                );
                dependency
            }
        }
    }

    fn validate(&self, index: usize) -> Result<(), ConfigError> {
        for (field, value) in [
            ("groupId", &self.group_id),
            ("artifactId", &self.artifact_id),
            ("version", &self.version),
        ] {
            let value = value.trim();
            if value.is_empty() {
                return Err(ConfigError::InvalidDeclaration { index, field });
            }
            if let Err(reason) = check_coordinate_part(value) {
                return Err(ConfigError::UnsafeDeclaration {
                    index,
                    field,
                    reason,
                });
            }
        }
        Ok(())
    }
}

/// The parsed dependency configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependenciesConfig {
    /// Repository alias to base URL.
    #[serde(default)]
    pub repositories: BTreeMap<String, String>,
    /// Required dependencies.
    #[serde(default)]
    pub dependencies: Vec<DependencyDeclaration>,
}

impl DependenciesConfig {
    /// Parses a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed JSON and
    /// [`ConfigError::InvalidDeclaration`] when a declaration has an empty
    /// coordinate part, [`ConfigError::UnsafeDeclaration`] when a part
    /// contains a path separator, `..` or a control character.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(bytes)
            .map_err(|e| ConfigError::parse(DEPENDENCIES_RESOURCE, e))?;
        for (index, declaration) in config.dependencies.iter().enumerate() {
            declaration.validate(index)?;
        }
        Ok(config)
    }

    /// Reads and parses the configuration from `provider`.
    ///
    /// Returns `None` when the resource is absent or malformed; the latter is
    /// logged as a warning.
    #[must_use]
    pub fn load(provider: &dyn ResourceProvider) -> Option<Self> {
        let Some(bytes) = provider.resource(DEPENDENCIES_RESOURCE) else {
            debug!(resource = DEPENDENCIES_RESOURCE, "No dependency configuration present");
            return None;
        };
        match Self::from_json(&bytes) {
            Ok(config) => Some(config),
            Err(error) => {
                warn!(error = %error, "Invalid dependency configuration; nothing will be resolved");
                None
            }
        }
    }

    /// Registers every configured repository that is not already bound.
    ///
    /// Returns how many repositories were added. Invalid URLs are logged and
    /// skipped.
    pub fn register_repositories(
        &self,
        manager: &RepositoryManager,
        http_config: &RepositoryHttpConfig,
    ) -> usize {
        let mut added = 0;
        for (alias, url) in &self.repositories {
            if manager.get_by_name(alias).is_some() {
                debug!(alias = %alias, "Will not redefine repository");
                continue;
            }
            match MavenRepository::new(alias.clone(), url, http_config) {
                Ok(repository) => {
                    if manager.add_repository(alias.clone(), Arc::new(repository)) {
                        debug!(alias = %alias, url = %url, "Made new repository");
                        added += 1;
                    }
                }
                Err(error) => warn!(alias = %alias, error = %error, "Skipping repository"),
            }
        }
        added
    }

    /// Converts every declaration into a [`Dependency`], resolving pins
    /// against `manager`.
    #[must_use]
    pub fn dependencies(&self, manager: &RepositoryManager) -> Vec<Dependency> {
        self.dependencies
            .iter()
            .map(|declaration| declaration.to_dependency(manager))
            .collect()
    }
}
