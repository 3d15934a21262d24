//! Maven Central, the public coordinate-layout registry.

use super::http_client::RepositoryHttpConfig;
use super::{MavenRepository, RepositoryError};

/// Alias under which Maven Central is registered by default.
pub const MAVEN_CENTRAL_ALIAS: &str = "maven-central";

/// Base URL of Maven Central.
pub const MAVEN_CENTRAL_URL: &str = "https://repo1.maven.org/maven2/";

/// Creates the Maven Central repository (POM-based discovery).
///
/// # Errors
///
/// Returns [`RepositoryError`] if the HTTP client cannot be built.
pub fn maven_central(config: &RepositoryHttpConfig) -> Result<MavenRepository, RepositoryError> {
    MavenRepository::new(MAVEN_CENTRAL_ALIAS, MAVEN_CENTRAL_URL, config)
}
