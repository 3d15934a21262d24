//! Dependency resolution and materialization.
//!
//! The [`DownloadEngine`] turns a [`Dependency`](crate::dependency::Dependency)
//! into a file in the libraries directory, resolving its transitive closure
//! along the way and handing each finished file to a [`DependencyLoader`].
//!
//! # Features
//!
//! - In-flight dedup: one pipeline per coordinates, shared by every caller
//! - Cycle-safe waiting across branches, and one loader call per coordinates
//! - Containment race across candidate repositories
//! - Atomic writes (temp file, sync, rename)
//! - Retry with exponential backoff for transient download errors
//! - Stored transitive manifests, so a materialized closure resolves offline

mod atomic;
mod engine;
mod error;
mod ledger;
mod loader;
pub mod manifest;
mod retry;
mod waits;

pub use engine::{
    DownloadEngine, EngineOptions, EngineStats, LIBRARIES_DIR_NAME, libraries_dir_for,
};
pub use error::{EngineError, MaterializeError};
pub use ledger::{InFlightLedger, ResolutionHandle};
pub use loader::{DependencyLoader, LoadError, LoggingLoader, RecordingLoader};
pub use retry::{DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy, classify_error};
