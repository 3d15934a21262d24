//! The hook that makes a materialized artifact usable by the host.
//!
//! The engine calls [`DependencyLoader::load`] exactly once per successful
//! pipeline run, after the file is on disk and after every transitive
//! dependency has finished its own pipeline. Children therefore always load
//! before their parents.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::info;

use crate::dependency::Dependency;

/// Errors reported by a loader.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The host refused the artifact.
    #[error("loader rejected {dependency}: {reason}")]
    Rejected {
        /// Coordinates of the rejected dependency.
        dependency: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The artifact could not be read.
    #[error("could not read {path}: {source}")]
    Io {
        /// The artifact path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    /// Creates a rejection error.
    pub fn rejected(dependency: impl ToString, reason: impl Into<String>) -> Self {
        Self::Rejected {
            dependency: dependency.to_string(),
            reason: reason.into(),
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

/// Makes a resolved artifact available to the host.
pub trait DependencyLoader: Send + Sync {
    /// Loads `dependency` from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when the host cannot use the artifact. The engine
    /// logs the error; the dependency still counts as resolved.
    fn load(&self, dependency: &Dependency, path: &Path) -> Result<(), LoadError>;
}

/// Loader that only logs each artifact.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingLoader;

impl DependencyLoader for LoggingLoader {
    fn load(&self, dependency: &Dependency, path: &Path) -> Result<(), LoadError> {
        info!(dependency = %dependency, path = %path.display(), "Loaded dependency");
        Ok(())
    }
}

/// Loader that records the order artifacts were handed to it.
#[derive(Debug, Default)]
pub struct RecordingLoader {
    loaded: Mutex<Vec<(Dependency, PathBuf)>>,
}

impl RecordingLoader {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Dependencies in load order.
    #[must_use]
    pub fn loaded(&self) -> Vec<Dependency> {
        self.entries().into_iter().map(|(dep, _)| dep).collect()
    }

    /// Dependencies and their paths in load order.
    #[must_use]
    pub fn entries(&self) -> Vec<(Dependency, PathBuf)> {
        match self.loaded.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Position of `dependency` in the load order.
    #[must_use]
    pub fn position(&self, dependency: &Dependency) -> Option<usize> {
        self.loaded().iter().position(|dep| dep == dependency)
    }
}

impl DependencyLoader for RecordingLoader {
    fn load(&self, dependency: &Dependency, path: &Path) -> Result<(), LoadError> {
        let mut guard = match self.loaded.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push((dependency.clone(), path.to_path_buf()));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_loader_keeps_order() {
        let loader = RecordingLoader::new();
        let first = Dependency::new("g", "first", "1");
        let second = Dependency::new("g", "second", "1");

        loader.load(&second, Path::new("/libs/second-1.jar")).unwrap();
        loader.load(&first, Path::new("/libs/first-1.jar")).unwrap();

        assert_eq!(loader.loaded(), vec![second.clone(), first.clone()]);
        assert_eq!(loader.position(&first), Some(1));
        assert_eq!(loader.entries()[0].1, PathBuf::from("/libs/second-1.jar"));
    }

    #[test]
    fn test_logging_loader_accepts_everything() {
        let dep = Dependency::new("g", "a", "1");
        assert!(LoggingLoader.load(&dep, Path::new("a-1.jar")).is_ok());
    }

    #[test]
    fn test_load_error_display() {
        let msg = LoadError::rejected("g:a:1", "duplicate class").to_string();
        assert!(msg.contains("g:a:1") && msg.contains("duplicate class"), "{msg}");
    }
}
