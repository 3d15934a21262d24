//! Repository backed by the Spigot plugin-hosting site.
//!
//! Artifacts follow the usual coordinate layout, but the site publishes
//! dependency information as a JSON resource manifest rather than a POM.

use std::sync::Arc;

use super::discovery::ResourceManifestDiscovery;
use super::http_client::RepositoryHttpConfig;
use super::{MavenRepository, RepositoryError};

/// Alias under which the plugin-hosting repository is registered by default.
pub const SPIGOT_ALIAS: &str = "spigot";

/// Base URL of the plugin-hosting repository.
pub const SPIGOT_URL: &str = "https://hub.spigotmc.org/nexus/content/repositories/public/";

/// Creates the plugin-hosting repository (resource-manifest discovery).
///
/// # Errors
///
/// Returns [`RepositoryError`] if the HTTP client cannot be built.
pub fn spigot(config: &RepositoryHttpConfig) -> Result<MavenRepository, RepositoryError> {
    MavenRepository::with_discovery(
        SPIGOT_ALIAS,
        SPIGOT_URL,
        config,
        Arc::new(ResourceManifestDiscovery),
    )
}
