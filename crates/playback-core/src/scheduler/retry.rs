//! Retry helper for the scheduler's inner loop.
//!
//! Ported from `mesio::hls::retry`'s `RetryPolicy`/`retry_with_backoff`
//! shape, narrowed to the single case spec.md §4.4 calls for: a flat 2s
//! wait on `PreconditionFailed` (HTTP 412), not an escalating backoff.

use crate::error::FetchError;
use std::future::Future;
use std::time::Duration;

/// What the caller should do after an attempt failed.
pub enum RetryAction<T> {
    /// Stop retrying and return this value/error to the caller.
    Stop(Result<T, FetchError>),
    /// Wait, then retry.
    Retry,
}

/// Run `attempt` until it succeeds or returns a non-412 error, waiting
/// `delay` between 412 responses. There is no retry limit here: the outer
/// scheduler loop owns cancellation via the `CancellationToken` passed to
/// [`super::SegmentScheduler::run`], mirroring how mesio's retry loop
/// defers to the caller for an overall deadline.
pub async fn retry_precondition<T, F, Fut>(delay: Duration, mut attempt: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(FetchError::PreconditionFailed) => {
                tokio::time::sleep(delay).await;
                continue;
            }
            Err(other) => return Err(other),
        }
    }
}

/// Classifies a single attempt's result the way mesio's `RetryPolicy`
/// decides whether to retry or give up.
pub fn classify<T>(result: Result<T, FetchError>) -> RetryAction<T> {
    match result {
        Err(FetchError::PreconditionFailed) => RetryAction::Retry,
        other => RetryAction::Stop(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn retries_on_precondition_failed_then_succeeds() {
        let attempts = AtomicU32::new(0);
        let result = retry_precondition(Duration::from_millis(1), || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(FetchError::PreconditionFailed)
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_412_errors_are_not_retried() {
        let result: Result<u32, FetchError> = retry_precondition(Duration::from_millis(1), || async {
            Err(FetchError::Fatal { reason: "bad segment".into() })
        })
        .await;
        assert!(matches!(result, Err(FetchError::Fatal { .. })));
    }
}
