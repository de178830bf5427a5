//! Error vocabulary understood by the classifier, and the retry driver's own error.

use std::fmt;

use crate::cancel::CancelCause;

/// Semantic tags an operation can attach to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    #[error("timeout")]
    Timeout,
    #[error("temporary")]
    Temporary,
    #[error("bad request")]
    BadRequest,
}

/// Network-layer failure with the flags a transport reports about it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct NetFault {
    pub message: String,
    /// The operation hit a connect/read/overall timeout.
    pub timeout: bool,
    /// The condition is expected to clear on its own (reset, refused, DNS hiccup).
    pub temporary: bool,
}

impl NetFault {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timeout: true,
            temporary: false,
        }
    }

    pub fn temporary(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timeout: false,
            temporary: true,
        }
    }
}

/// Downstream answered with an HTTP status the caller treats as a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpStatusError {
    pub status: u16,
    pub body: String,
}

impl HttpStatusError {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }
}

impl fmt::Display for HttpStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.body.is_empty() {
            write!(f, "http status {}", self.status)
        } else {
            write!(f, "http status {}: {}", self.status, self.body)
        }
    }
}

impl std::error::Error for HttpStatusError {}

/// Why the retry driver stopped without a success value.
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    /// `max_attempts` was zero; the operation was never invoked.
    #[error("max_attempts must be > 0")]
    InvalidAttempts,
    /// The signal fired before an attempt or during a backoff wait.
    #[error("retry canceled")]
    Canceled(#[source] CancelCause),
    /// Last failure of the operation: non-retryable, or attempts exhausted.
    #[error("operation failed after {attempts} attempt(s)")]
    Operation {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },
}

impl RetryError {
    pub fn is_canceled(&self) -> bool {
        matches!(self, RetryError::Canceled(_))
    }

    pub fn cancel_cause(&self) -> Option<CancelCause> {
        match self {
            RetryError::Canceled(cause) => Some(*cause),
            _ => None,
        }
    }

    /// Number of times the operation ran before the driver gave up.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            RetryError::Operation { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// The operation's own error, if the stop was not a cancellation.
    pub fn operation_error(&self) -> Option<&anyhow::Error> {
        match self {
            RetryError::Operation { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn into_operation_error(self) -> Result<anyhow::Error, Self> {
        match self {
            RetryError::Operation { source, .. } => Ok(source),
            other => Err(other),
        }
    }
}
