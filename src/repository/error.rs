//! Error types for repository operations.
//!
//! Repository calls report transport problems as errors rather than a plain
//! `false`, so the engine can tell "not hosted here" apart from "could not ask".

use thiserror::Error;

/// Errors that can occur while talking to a repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Unexpected HTTP status (anything other than success or not-found).
    #[error("HTTP {status} requesting {url}")]
    HttpStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// A base URL or derived artifact URL could not be built.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The offending URL string.
        url: String,
    },

    /// A dependency descriptor was fetched but could not be understood.
    #[error("malformed descriptor at {url}: {reason}")]
    MalformedDescriptor {
        /// Where the descriptor came from.
        url: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The HTTP client could not be constructed.
    #[error("HTTP client for repository '{repository}' could not be built: {reason}")]
    ClientBuild {
        /// Repository alias the client was being built for.
        repository: String,
        /// Why construction failed.
        reason: String,
    },
}

impl RepositoryError {
    /// Creates a network error from a reqwest error, promoting timeouts.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Network {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a malformed descriptor error.
    pub fn malformed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedDescriptor {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a client construction error.
    pub fn client_build(repository: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ClientBuild {
            repository: repository.into(),
            reason: reason.into(),
        }
    }
}
