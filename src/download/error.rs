//! Error types for the resolution engine.
//!
//! None of these escape [`DownloadEngine`](super::DownloadEngine)'s public
//! operations: a failed pipeline resolves to `None` and the error is logged
//! with full context. They exist so the logs carry one consistent message per
//! failure kind.

use std::path::PathBuf;

use thiserror::Error;

use crate::repository::RepositoryError;

/// Why a dependency's pipeline did not produce a file.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No candidate repository reported hosting the dependency.
    #[error("{dependency} was not found in any of {candidates} candidate repositories")]
    NotFound {
        /// Coordinates of the missing dependency.
        dependency: String,
        /// How many repositories were asked.
        candidates: usize,
    },

    /// The artifact bytes could not be fetched.
    #[error("download of {dependency} from {repository} failed after {attempts} attempt(s): {source}")]
    Download {
        /// Coordinates of the dependency.
        dependency: String,
        /// Repository the download was attempted from.
        repository: String,
        /// Attempts made, including the first.
        attempts: u32,
        /// The last repository error.
        #[source]
        source: RepositoryError,
    },

    /// The coordinates cannot be turned into a file inside the libraries
    /// directory.
    #[error("{dependency} has coordinates that are not a plain file name")]
    UnsafeCoordinates {
        /// Coordinates of the rejected dependency.
        dependency: String,
    },

    /// The engine was cancelled while the pipeline was running.
    #[error("resolution of {dependency} was cancelled")]
    Cancelled {
        /// Coordinates of the dependency.
        dependency: String,
    },

    /// Downloaded bytes could not be written to the libraries directory.
    #[error("could not store {dependency}: {source}")]
    Materialize {
        /// Coordinates of the dependency.
        dependency: String,
        /// The underlying write failure.
        #[source]
        source: MaterializeError,
    },
}

impl EngineError {
    /// Creates a not-found error.
    pub fn not_found(dependency: impl ToString, candidates: usize) -> Self {
        Self::NotFound {
            dependency: dependency.to_string(),
            candidates,
        }
    }

    /// Creates a download error.
    pub fn download(
        dependency: impl ToString,
        repository: impl Into<String>,
        attempts: u32,
        source: RepositoryError,
    ) -> Self {
        Self::Download {
            dependency: dependency.to_string(),
            repository: repository.into(),
            attempts,
            source,
        }
    }

    /// Creates an unsafe-coordinates error.
    pub fn unsafe_coordinates(dependency: impl ToString) -> Self {
        Self::UnsafeCoordinates {
            dependency: dependency.to_string(),
        }
    }

    /// Creates a cancellation error.
    pub fn cancelled(dependency: impl ToString) -> Self {
        Self::Cancelled {
            dependency: dependency.to_string(),
        }
    }

    /// Creates a materialization error.
    pub fn materialize(dependency: impl ToString, source: MaterializeError) -> Self {
        Self::Materialize {
            dependency: dependency.to_string(),
            source,
        }
    }

    /// Returns true when the failure was caused by cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Failures while writing an artifact or its manifest to disk.
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// File system error (create, write, sync).
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The completed temp file could not be moved into place.
    #[error("could not move {from} to {to}: {source}")]
    Rename {
        /// Temp file that was written.
        from: PathBuf,
        /// Final destination.
        to: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The transitive manifest could not be serialized.
    #[error("could not serialize manifest {path}: {source}")]
    Manifest {
        /// Manifest path.
        path: PathBuf,
        /// The serialization error.
        #[source]
        source: serde_json::Error,
    },
}

impl MaterializeError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a rename error.
    pub fn rename(from: impl Into<PathBuf>, to: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Rename {
            from: from.into(),
            to: to.into(),
            source,
        }
    }

    /// Creates a manifest serialization error.
    pub fn manifest(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Manifest {
            path: path.into(),
            source,
        }
    }
}
