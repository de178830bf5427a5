//! Retry loop: run an operation until success, a non-retryable failure,
//! exhaustion, or cancellation.

use std::future::Future;

use crate::cancel::CancelSignal;

use super::backoff::Backoff;
use super::error::RetryError;
use super::policy::{RetryDecision, RetryPolicy};

/// Runs `operation` up to `max_attempts` times on the caller's task.
///
/// Cancellation is checked before every attempt and raced against each
/// backoff wait. On failure, `should_retry` decides whether another attempt
/// is worth making; the last failure is always returned, never dropped.
/// Nothing is spawned and nothing is logged.
pub async fn retry<T, F, Fut, P>(
    cancel: &CancelSignal,
    max_attempts: u32,
    backoff: &Backoff,
    mut operation: F,
    should_retry: P,
) -> Result<T, RetryError>
where
    F: FnMut(CancelSignal) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
    P: Fn(&anyhow::Error) -> bool,
{
    if max_attempts == 0 {
        return Err(RetryError::InvalidAttempts);
    }
    let policy = RetryPolicy::new(max_attempts, backoff.clone());

    let mut attempt = 0u32;
    loop {
        if let Some(cause) = cancel.cause() {
            return Err(RetryError::Canceled(cause));
        }

        let err = match operation(cancel.clone()).await {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };

        match policy.decide(attempt, should_retry(&err)) {
            RetryDecision::NoRetry => {
                return Err(RetryError::Operation {
                    attempts: attempt + 1,
                    source: err,
                })
            }
            RetryDecision::RetryAfter(wait) => {
                tokio::select! {
                    biased;
                    cause = cancel.cancelled() => return Err(RetryError::Canceled(cause)),
                    _ = tokio::time::sleep(wait) => {}
                }
            }
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::{CancelCause, CancelSource};
    use crate::retry::{is_retryable, Fault, HttpStatusError};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn fast_backoff() -> Backoff {
        Backoff::new(Duration::from_millis(1), Duration::from_millis(3), 2.0).with_seed(1)
    }

    #[tokio::test]
    async fn succeeds_after_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let res = retry(
            &CancelSignal::never(),
            5,
            &fast_backoff(),
            move |_cancel| {
                let c = Arc::clone(&c);
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < 2 {
                        return Err(anyhow::Error::new(Fault::Temporary));
                    }
                    anyhow::Ok("done")
                }
            },
            is_retryable,
        )
        .await;
        assert_eq!(res.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_on_non_retryable() {
        let mut calls = 0u32;
        let res: Result<(), _> = retry(
            &CancelSignal::never(),
            5,
            &fast_backoff(),
            |_cancel| {
                calls += 1;
                async { Err(anyhow::Error::new(Fault::BadRequest)) }
            },
            is_retryable,
        )
        .await;
        let err = res.unwrap_err();
        assert_eq!(calls, 1);
        assert_eq!(err.attempts(), Some(1));
        let source = err.operation_error().expect("operation error");
        assert_eq!(source.downcast_ref::<Fault>(), Some(&Fault::BadRequest));
    }

    #[tokio::test]
    async fn exhaustion_returns_last_error() {
        let mut calls = 0u16;
        let res: Result<(), _> = retry(
            &CancelSignal::never(),
            3,
            &fast_backoff(),
            |_cancel| {
                calls += 1;
                let status = 500 + calls;
                async move { Err(anyhow::Error::new(HttpStatusError::new(status))) }
            },
            is_retryable,
        )
        .await;
        let err = res.unwrap_err();
        assert_eq!(calls, 3);
        assert_eq!(err.attempts(), Some(3));
        let last = err.operation_error().unwrap();
        assert_eq!(last.downcast_ref::<HttpStatusError>().unwrap().status, 503);
    }

    #[tokio::test]
    async fn exhausted_error_chain_names_each_layer_once() {
        use anyhow::Context;

        let res: Result<(), _> = retry(
            &CancelSignal::never(),
            2,
            &fast_backoff(),
            |_cancel| async {
                Err::<(), _>(HttpStatusError::new(503)).context("HEAD http://x/")
            },
            is_retryable,
        )
        .await;
        let err = anyhow::Error::new(res.unwrap_err());
        assert_eq!(
            format!("{:#}", err),
            "operation failed after 2 attempt(s): HEAD http://x/: http status 503"
        );
    }

    #[tokio::test]
    async fn zero_attempts_is_a_config_error() {
        let mut calls = 0u32;
        let res: Result<(), _> = retry(
            &CancelSignal::never(),
            0,
            &fast_backoff(),
            |_cancel| {
                calls += 1;
                async { anyhow::Ok(()) }
            },
            is_retryable,
        )
        .await;
        assert!(matches!(res, Err(RetryError::InvalidAttempts)));
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn injected_predicate_overrides_default() {
        let mut calls = 0u32;
        let res: Result<(), _> = retry(
            &CancelSignal::never(),
            4,
            &fast_backoff(),
            |_cancel| {
                calls += 1;
                async { Err(anyhow::anyhow!("opaque")) }
            },
            |_err: &anyhow::Error| true,
        )
        .await;
        assert!(res.is_err());
        assert_eq!(calls, 4);
    }

    #[tokio::test]
    async fn precancelled_never_invokes_operation() {
        let source = CancelSource::new();
        source.cancel();
        let mut calls = 0u32;
        let res: Result<(), _> = retry(
            &source.signal(),
            5,
            &fast_backoff(),
            |_cancel| {
                calls += 1;
                async { anyhow::Ok(()) }
            },
            is_retryable,
        )
        .await;
        let err = res.unwrap_err();
        assert_eq!(err.cancel_cause(), Some(CancelCause::Canceled));
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn deadline_during_wait_reports_cancellation() {
        let backoff = Backoff::new(Duration::from_millis(500), Duration::from_millis(500), 2.0);
        let source = CancelSource::with_timeout(Duration::from_millis(20));
        let started = Instant::now();
        let res: Result<(), _> = retry(
            &source.signal(),
            10,
            &backoff,
            |_cancel| async { Err(anyhow::Error::new(Fault::Temporary)) },
            is_retryable,
        )
        .await;
        let err = res.unwrap_err();
        assert!(err.is_canceled(), "want cancellation, got {err}");
        assert_eq!(err.cancel_cause(), Some(CancelCause::DeadlineExceeded));
        assert!(err.operation_error().is_none());
        assert!(started.elapsed() < Duration::from_millis(400));
        let chained: anyhow::Error = err.into();
        assert_eq!(
            chained.root_cause().downcast_ref::<CancelCause>(),
            Some(&CancelCause::DeadlineExceeded)
        );
    }

    #[tokio::test]
    async fn manual_cancel_during_wait() {
        let backoff = Backoff::new(Duration::from_secs(5), Duration::from_secs(5), 2.0);
        let source = CancelSource::new();
        let signal = source.signal();
        let handle = tokio::spawn(async move {
            retry(
                &signal,
                3,
                &backoff,
                |_cancel| async { Err::<(), _>(anyhow::Error::new(Fault::Timeout)) },
                is_retryable,
            )
            .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        source.cancel();
        let res = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("retry should observe cancellation")
            .unwrap();
        assert_eq!(res.unwrap_err().cancel_cause(), Some(CancelCause::Canceled));
    }

    #[tokio::test]
    async fn operation_receives_signal() {
        let source = CancelSource::new();
        let res = retry(
            &source.signal(),
            1,
            &fast_backoff(),
            |cancel: CancelSignal| async move { anyhow::Ok(cancel.is_done()) },
            is_retryable,
        )
        .await;
        assert!(!res.unwrap());
    }
}
