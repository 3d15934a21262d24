//! Error types for configuration loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading the dependency configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid JSON or does not match the expected shape.
    #[error("could not parse {resource}: {source}")]
    Parse {
        /// Name of the resource being parsed.
        resource: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A dependency declaration is missing a coordinate part.
    #[error("invalid dependency declaration #{index}: {field} must not be empty")]
    InvalidDeclaration {
        /// Zero-based position in the `dependencies` list.
        index: usize,
        /// Which coordinate part was empty.
        field: &'static str,
    },

    /// A dependency declaration has a coordinate part that cannot be used in
    /// a file name.
    #[error("invalid dependency declaration #{index}: {field} {reason}")]
    UnsafeDeclaration {
        /// Zero-based position in the `dependencies` list.
        index: usize,
        /// Which coordinate part was rejected.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A resource file exists but could not be read.
    #[error("IO error reading {path}: {source}")]
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Creates a parse error.
    pub fn parse(resource: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Parse {
            resource: resource.into(),
            source,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
