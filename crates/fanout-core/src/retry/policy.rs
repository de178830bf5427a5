use std::future::Future;
use std::time::Duration;

use crate::cancel::CancelSignal;

use super::backoff::Backoff;
use super::error::RetryError;

/// High-level classification of an error for retry purposes.
///
/// Operations report failures through `Fault`, `NetFault`, `HttpStatusError`
/// or plain io errors; `classify` maps those onto these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Tagged as a timeout by the operation.
    Timeout,
    /// Tagged as temporary by the operation.
    Temporary,
    /// Caller error; repeating the same request cannot help.
    BadRequest,
    /// Transport failure with the flags it reported.
    Network { timeout: bool, temporary: bool },
    /// 429 Too Many Requests.
    Throttled,
    /// 500..=599.
    Http5xx(u16),
    /// Any other HTTP status.
    Http(u16),
    /// No recognized signal.
    Other,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        match self {
            ErrorKind::Timeout
            | ErrorKind::Temporary
            | ErrorKind::Throttled
            | ErrorKind::Http5xx(_) => true,
            ErrorKind::Network { timeout, temporary } => timeout || temporary,
            ErrorKind::BadRequest | ErrorKind::Http(_) | ErrorKind::Other => false,
        }
    }
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Attempt budget plus backoff schedule.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Backoff::new(Duration::from_millis(50), Duration::from_secs(2), 2.0)
                .with_jitter(0.2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// What to do after attempt `attempt` (0-based) failed.
    ///
    /// Returns `RetryDecision::NoRetry` when the error is not retryable or
    /// `attempt` was the last one allowed.
    pub fn decide(&self, attempt: u32, retryable: bool) -> RetryDecision {
        if !retryable || attempt.saturating_add(1) >= self.max_attempts {
            return RetryDecision::NoRetry;
        }
        let index = i32::try_from(attempt).unwrap_or(i32::MAX);
        RetryDecision::RetryAfter(self.backoff.duration(index))
    }

    /// Run `operation` under this policy; see [`super::retry`].
    pub async fn run<T, F, Fut, P>(
        &self,
        cancel: &CancelSignal,
        operation: F,
        should_retry: P,
    ) -> Result<T, RetryError>
    where
        F: FnMut(CancelSignal) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
        P: Fn(&anyhow::Error) -> bool,
    {
        super::run::retry(cancel, self.max_attempts, &self.backoff, operation, should_retry).await
    }
}
