//! Depman Core Library
//!
//! Resolves runtime library dependencies declared by a host application,
//! downloads them (and their transitive dependencies) from named Maven-style
//! repositories into a shared libraries directory, and hands each file to a
//! loader.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`dependency`] - Artifact coordinates and file naming
//! - [`repository`] - The repository abstraction, its HTTP implementation and the alias registry
//! - [`download`] - Resolution engine with in-flight dedup and atomic writes
//! - [`config`] - `dependencies.json` parsing and resource lookup
//! - [`coordinator`] - Required-dependency set and the load-everything entry point

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod coordinator;
pub mod dependency;
pub mod download;
pub mod repository;
mod user_agent;

// Re-export commonly used types
pub use config::{
    ConfigError, DEPENDENCIES_RESOURCE, DependenciesConfig, DependencyDeclaration,
    DirectoryResources, ResourceProvider,
};
pub use coordinator::{DependencyCoordinator, LoadReport};
pub use dependency::{CoordinateError, Dependency};
pub use download::{
    DEFAULT_MAX_RETRIES, DependencyLoader, DownloadEngine, EngineError, EngineOptions,
    LoadError, LoggingLoader, RecordingLoader, RetryPolicy, libraries_dir_for,
};
pub use repository::{
    MavenRepository, Repository, RepositoryError, RepositoryHttpConfig, RepositoryManager,
};
