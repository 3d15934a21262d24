//! In-flight ledger: at most one pipeline per coordinates per engine.
//!
//! Each entry maps a [`Dependency`] (coordinates only) to a cloneable handle
//! on the pipeline's eventual result. The first caller inserts and starts the
//! pipeline; everyone after it receives the same handle. The pipeline removes
//! its own entry once it finishes, so a failed dependency can be retried by a
//! later request.

use std::path::PathBuf;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tracing::trace;

use crate::dependency::Dependency;

/// Shared handle on one pipeline's outcome.
pub type ResolutionHandle = Shared<BoxFuture<'static, Option<PathBuf>>>;

/// Coordinates-keyed map of running pipelines.
#[derive(Default)]
pub struct InFlightLedger {
    entries: DashMap<Dependency, ResolutionHandle>,
}

impl InFlightLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the running handle for `dependency`, or starts one.
    ///
    /// `start` is called at most once per absent entry, while the entry is
    /// reserved, so two racing callers can never both start a pipeline. The
    /// boolean is true when this call started it.
    pub fn get_or_start<F>(&self, dependency: &Dependency, start: F) -> (ResolutionHandle, bool)
    where
        F: FnOnce() -> BoxFuture<'static, Option<PathBuf>>,
    {
        match self.entries.entry(dependency.clone()) {
            Entry::Occupied(existing) => {
                trace!(dependency = %dependency, "Joining in-flight resolution");
                (existing.get().clone(), false)
            }
            Entry::Vacant(slot) => {
                let handle = start().shared();
                slot.insert(handle.clone());
                (handle, true)
            }
        }
    }

    /// Removes the entry for `dependency`.
    pub fn complete(&self, dependency: &Dependency) {
        self.entries.remove(dependency);
    }

    /// Returns true if a pipeline for `dependency` is running.
    #[must_use]
    pub fn contains(&self, dependency: &Dependency) -> bool {
        self.entries.contains_key(dependency)
    }

    /// Number of running pipelines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is running.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for InFlightLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlightLedger")
            .field("in_flight", &self.len())
            .finish()
    }
}
