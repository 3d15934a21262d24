//! Generic coordinate-layout HTTP repository.
//!
//! Artifacts live at
//! `{base}/{group path}/{artifact}/{version}/{artifact}-{version}.{ext}`.
//! Containment is a `HEAD` on the jar, downloads are a `GET`, and transitive
//! discovery is delegated to a [`TransitiveDiscovery`] strategy.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use crate::dependency::{ARTIFACT_EXTENSION, Dependency};

use super::discovery::{PomDiscovery, TransitiveDiscovery};
use super::http_client::{RepositoryHttpConfig, build_repository_http_client};
use super::{Repository, RepositoryError};

/// HTTP repository parameterized by base URL and discovery strategy.
pub struct MavenRepository {
    name: String,
    base_url: Url,
    client: Client,
    discovery: Arc<dyn TransitiveDiscovery>,
}

impl MavenRepository {
    /// Creates a repository that discovers transitives from POM descriptors.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the base URL is invalid or the HTTP
    /// client cannot be built.
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        config: &RepositoryHttpConfig,
    ) -> Result<Self, RepositoryError> {
        Self::with_discovery(name, base_url, config, Arc::new(PomDiscovery))
    }

    /// Creates a repository with an explicit discovery strategy.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the base URL is invalid or the HTTP
    /// client cannot be built.
    pub fn with_discovery(
        name: impl Into<String>,
        base_url: &str,
        config: &RepositoryHttpConfig,
        discovery: Arc<dyn TransitiveDiscovery>,
    ) -> Result<Self, RepositoryError> {
        let name = name.into();
        let client = build_repository_http_client(&name, config)?;
        Self::with_client(name, base_url, client, discovery)
    }

    /// Creates a repository around an existing client.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::InvalidUrl`] if `base_url` is not an
    /// absolute http(s) URL.
    pub fn with_client(
        name: impl Into<String>,
        base_url: &str,
        client: Client,
        discovery: Arc<dyn TransitiveDiscovery>,
    ) -> Result<Self, RepositoryError> {
        Ok(Self {
            name: name.into(),
            base_url: normalize_base_url(base_url)?,
            client,
            discovery,
        })
    }

    /// Base URL with a guaranteed trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL of the artifact's jar.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::InvalidUrl`] if the coordinates do not form
    /// a valid relative path.
    pub fn jar_url(&self, dependency: &Dependency) -> Result<Url, RepositoryError> {
        artifact_url(&self.base_url, dependency, ARTIFACT_EXTENSION)
    }
}

#[async_trait]
impl Repository for MavenRepository {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(repository = %self.name, dependency = %dependency))]
    async fn contains(&self, dependency: &Dependency) -> Result<bool, RepositoryError> {
        let url = self.jar_url(dependency)?;
        let response = self
            .client
            .head(url.clone())
            .send()
            .await
            .map_err(|e| RepositoryError::network(url.as_str(), e))?;

        let status = response.status();
        // Some hosts reject HEAD outright; ask again with GET before deciding.
        let status = if status == StatusCode::METHOD_NOT_ALLOWED {
            self.client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| RepositoryError::network(url.as_str(), e))?
                .status()
        } else {
            status
        };

        debug!(status = status.as_u16(), "containment check answered");
        if status.is_success() {
            Ok(true)
        } else if is_not_found(status) {
            Ok(false)
        } else {
            Err(RepositoryError::http_status(url.as_str(), status.as_u16()))
        }
    }

    #[instrument(skip(self), fields(repository = %self.name, dependency = %dependency))]
    async fn transitive_dependencies(
        &self,
        dependency: &Dependency,
    ) -> Result<HashSet<Dependency>, RepositoryError> {
        self.discovery
            .discover(&self.client, &self.base_url, dependency)
            .await
    }

    #[instrument(skip(self), fields(repository = %self.name, dependency = %dependency))]
    async fn download_dependency(
        &self,
        dependency: &Dependency,
    ) -> Result<Vec<u8>, RepositoryError> {
        let url = self.jar_url(dependency)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| RepositoryError::network(url.as_str(), e))?;

        if !response.status().is_success() {
            return Err(RepositoryError::http_status(
                url.as_str(),
                response.status().as_u16(),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RepositoryError::network(url.as_str(), e))?;
        debug!(bytes = bytes.len(), "artifact fetched");
        Ok(bytes.to_vec())
    }
}

impl fmt::Debug for MavenRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MavenRepository")
            .field("name", &self.name)
            .field("base_url", &self.base_url.as_str())
            .field("discovery", &self.discovery.name())
            .finish_non_exhaustive()
    }
}

/// Builds `{base}/{group path}/{artifact}/{version}/{artifact}-{version}.{ext}`.
pub(crate) fn artifact_url(
    base_url: &Url,
    dependency: &Dependency,
    extension: &str,
) -> Result<Url, RepositoryError> {
    let relative = format!(
        "{group}/{artifact}/{version}/{artifact}-{version}.{extension}",
        group = dependency.group_path(),
        artifact = dependency.artifact_id(),
        version = dependency.version(),
    );
    base_url
        .join(&relative)
        .map_err(|_| RepositoryError::invalid_url(format!("{base_url}{relative}")))
}

/// Fetches a text descriptor, mapping 404/410 to `None`.
pub(crate) async fn fetch_optional_text(
    client: &Client,
    url: &Url,
) -> Result<Option<String>, RepositoryError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| RepositoryError::network(url.as_str(), e))?;

    let status = response.status();
    if is_not_found(status) {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(RepositoryError::http_status(url.as_str(), status.as_u16()));
    }

    response
        .text()
        .await
        .map(Some)
        .map_err(|e| RepositoryError::network(url.as_str(), e))
}

fn is_not_found(status: StatusCode) -> bool {
    matches!(status, StatusCode::NOT_FOUND | StatusCode::GONE)
}

fn normalize_base_url(base_url: &str) -> Result<Url, RepositoryError> {
    let trimmed = base_url.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let parsed = Url::parse(&with_slash).map_err(|_| RepositoryError::invalid_url(trimmed))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(RepositoryError::invalid_url(trimmed));
    }
    Ok(parsed)
}
