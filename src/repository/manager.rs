//! Alias-keyed repository registry.
//!
//! The [`RepositoryManager`] owns every named repository one engine can
//! consult. Aliases are case-sensitive; the first registration of an alias
//! wins and later ones are ignored.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use super::central::{MAVEN_CENTRAL_ALIAS, maven_central};
use super::http_client::RepositoryHttpConfig;
use super::spigot::{SPIGOT_ALIAS, spigot};
use super::{Repository, RepositoryError};

/// A named collection of repositories.
#[derive(Default)]
pub struct RepositoryManager {
    repositories: DashMap<String, Arc<dyn Repository>>,
}

impl RepositoryManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manager with Maven Central and the plugin-hosting repository.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if a repository HTTP client cannot be built.
    pub fn with_default_repositories(config: &RepositoryHttpConfig) -> Result<Self, RepositoryError> {
        let manager = Self::new();
        manager.add_repository(MAVEN_CENTRAL_ALIAS, Arc::new(maven_central(config)?));
        manager.add_repository(SPIGOT_ALIAS, Arc::new(spigot(config)?));
        Ok(manager)
    }

    /// Registers `repository` under `alias`.
    ///
    /// Returns `false` (and keeps the existing binding) when the alias is
    /// already taken.
    #[tracing::instrument(skip(self, alias, repository), fields(repository_name = repository.name()))]
    pub fn add_repository(&self, alias: impl Into<String>, repository: Arc<dyn Repository>) -> bool {
        let alias = alias.into();
        match self.repositories.entry(alias) {
            Entry::Occupied(existing) => {
                debug!(alias = %existing.key(), "Will not redefine repository");
                false
            }
            Entry::Vacant(slot) => {
                debug!(alias = %slot.key(), "Registering repository");
                slot.insert(repository);
                true
            }
        }
    }

    /// Looks up a repository by alias.
    #[must_use]
    pub fn get_by_name(&self, alias: &str) -> Option<Arc<dyn Repository>> {
        self.repositories
            .get(alias)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Returns every registered repository (order unspecified).
    #[must_use]
    pub fn repositories(&self) -> Vec<Arc<dyn Repository>> {
        self.repositories
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Returns every registered alias, sorted.
    #[must_use]
    pub fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self
            .repositories
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        aliases.sort();
        aliases
    }

    /// Returns the number of registered repositories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    /// Returns true if no repositories are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}

impl std::fmt::Debug for RepositoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryManager")
            .field("repository_count", &self.len())
            .field("aliases", &self.aliases())
            .finish()
    }
}
