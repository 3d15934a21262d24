use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::{CallFailure, CallLimits};
use crate::dependency::Dependency;
use crate::download::error::EngineError;
use crate::download::retry::{RetryDecision, RetryPolicy, classify_error};
use crate::repository::Repository;

/// Fetches the artifact bytes from `repository`, retrying transient errors.
///
/// Each attempt is bounded by the call limits; backoff sleeps end early on
/// cancellation.
#[instrument(skip_all, fields(dependency = %dependency, repository = repository.name()))]
pub(super) async fn fetch_with_retry(
    repository: &Arc<dyn Repository>,
    dependency: &Dependency,
    limits: &CallLimits,
    policy: &RetryPolicy,
) -> Result<Vec<u8>, EngineError> {
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        debug!(attempt, "Attempting download");

        let error = match limits
            .run(
                dependency,
                repository.name(),
                "download",
                repository.download_dependency(dependency),
            )
            .await
        {
            Ok(bytes) => return Ok(bytes),
            Err(CallFailure::Cancelled) => return Err(EngineError::cancelled(dependency)),
            Err(CallFailure::Repository(error)) => error,
        };

        match policy.should_retry(classify_error(&error), attempt) {
            RetryDecision::Retry {
                delay,
                attempt: next_attempt,
            } => {
                info!(
                    attempt = next_attempt,
                    max_attempts = policy.max_attempts(),
                    delay_ms = delay.as_millis(),
                    error = %error,
                    "Retrying download"
                );
                tokio::select! {
                    () = limits.token.cancelled() => return Err(EngineError::cancelled(dependency)),
                    () = tokio::time::sleep(delay) => {}
                }
            }
            RetryDecision::DoNotRetry { reason } => {
                debug!(%reason, "Not retrying download");
                return Err(EngineError::download(
                    dependency,
                    repository.name(),
                    attempt,
                    error,
                ));
            }
        }
    }
}
