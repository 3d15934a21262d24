//! Containment race: ask every candidate at once, keep the first yes.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::{CallFailure, CallLimits};
use crate::dependency::Dependency;
use crate::repository::Repository;

/// Result of one race.
pub(super) enum RaceOutcome {
    /// This repository answered yes first.
    Found(Arc<dyn Repository>),
    /// Every candidate answered no or failed.
    NotFound,
    /// The engine was cancelled mid-race.
    Cancelled,
}

/// Checks every candidate concurrently and returns the first host.
///
/// Remaining checks are aborted as soon as a winner is known, so the winner
/// is assigned exactly once.
pub(super) async fn find_host(
    candidates: Vec<Arc<dyn Repository>>,
    dependency: &Dependency,
    limits: &CallLimits,
) -> RaceOutcome {
    let pinned = dependency.source_repository().is_some();
    let mut checks = JoinSet::new();

    for repository in candidates {
        let dependency = dependency.clone();
        let limits = limits.clone();
        checks.spawn(async move {
            let answer = limits
                .run(
                    &dependency,
                    repository.name(),
                    "contains",
                    repository.contains(&dependency),
                )
                .await;
            (repository, answer)
        });
    }

    while let Some(joined) = checks.join_next().await {
        let (repository, answer) = match joined {
            Ok(check) => check,
            Err(error) => {
                warn!(dependency = %dependency, error = %error, "Containment check did not complete");
                continue;
            }
        };

        match answer {
            Ok(true) => {
                checks.abort_all();
                debug!(
                    dependency = %dependency,
                    repository = repository.name(),
                    "Repository hosts dependency"
                );
                return RaceOutcome::Found(repository);
            }
            Ok(false) if pinned => {
                info!(
                    dependency = %dependency,
                    repository = repository.name(),
                    "Pinned repository does not contain dependency"
                );
            }
            Ok(false) => {
                debug!(
                    dependency = %dependency,
                    repository = repository.name(),
                    "Repository does not contain dependency"
                );
            }
            Err(CallFailure::Cancelled) => {
                checks.abort_all();
                return RaceOutcome::Cancelled;
            }
            Err(CallFailure::Repository(error)) => {
                warn!(
                    dependency = %dependency,
                    repository = repository.name(),
                    error = %error,
                    "Could not check repository"
                );
            }
        }
    }

    RaceOutcome::NotFound
}
