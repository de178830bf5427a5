//! Retry with exponential backoff, jitter, and cancellation.
//!
//! This module holds the error vocabulary operations use to describe their
//! failures, the classifier that turns those into retry decisions, the
//! backoff calculator, and the driver loop that ties them together so higher
//! layers (the worker pool, probing) share one consistent policy.

mod backoff;
mod classify;
mod error;
mod policy;
mod run;

pub use backoff::Backoff;
pub use classify::{classify, classify_http_status, classify_io_error, is_retryable};
pub use error::{Fault, HttpStatusError, NetFault, RetryError};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::retry;
