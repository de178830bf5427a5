//! Broadcast cancellation: a one-shot trigger plus an optional deadline.
//!
//! A `CancelSource` owns the trigger; any number of `CancelSignal` handles can
//! observe it. Signals are passed explicitly to every place that may suspend
//! (retry waits, pool dispatch, task bodies) and never consume the notification.

use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Why a signal fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelCause {
    /// `CancelSource::cancel` was called.
    Canceled,
    /// The signal's deadline elapsed.
    DeadlineExceeded,
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelCause::Canceled => write!(f, "canceled"),
            CancelCause::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}

impl std::error::Error for CancelCause {}

/// Owning side of a cancellation signal. Cancel is idempotent: the first cause wins.
#[derive(Debug)]
pub struct CancelSource {
    trigger: watch::Sender<Option<CancelCause>>,
    deadline: Option<Instant>,
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSource {
    /// A source that only fires when `cancel` is called.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            trigger: tx,
            deadline: None,
        }
    }

    /// A source that fires on `cancel` or once `timeout` has elapsed from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        let mut source = Self::new();
        source.deadline = Some(Instant::now() + timeout);
        source
    }

    /// Fire the signal with `CancelCause::Canceled` unless it already fired.
    pub fn cancel(&self) {
        self.trigger.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            *state = Some(CancelCause::Canceled);
            true
        });
    }

    /// A read-only handle for listeners.
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            trigger: Some(self.trigger.subscribe()),
            deadline: self.deadline,
        }
    }
}

/// Read-only, cloneable view of a cancellation source.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    trigger: Option<watch::Receiver<Option<CancelCause>>>,
    deadline: Option<Instant>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        Self {
            trigger: None,
            deadline: None,
        }
    }

    /// Derive a signal that shares this one's trigger and additionally expires
    /// after `timeout`. The earlier of the two deadlines applies.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) => existing.min(candidate),
            None => candidate,
        };
        Self {
            trigger: self.trigger.clone(),
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Why the signal fired, if it has. A manual cancel takes precedence over the deadline.
    pub fn cause(&self) -> Option<CancelCause> {
        if let Some(cause) = self.trigger.as_ref().and_then(|rx| *rx.borrow()) {
            return Some(cause);
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Some(CancelCause::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.cause().is_some()
    }

    /// Resolves once the signal fires. Returns immediately if it already has;
    /// never resolves for a signal with neither trigger nor deadline.
    pub async fn cancelled(&self) -> CancelCause {
        if let Some(cause) = self.cause() {
            return cause;
        }
        let triggered = wait_for_trigger(self.trigger.clone());
        match self.deadline {
            Some(deadline) => tokio::select! {
                cause = triggered => cause,
                _ = tokio::time::sleep_until(deadline) => CancelCause::DeadlineExceeded,
            },
            None => triggered.await,
        }
    }
}

async fn wait_for_trigger(trigger: Option<watch::Receiver<Option<CancelCause>>>) -> CancelCause {
    if let Some(mut rx) = trigger {
        if let Ok(state) = rx.wait_for(Option::is_some).await {
            if let Some(cause) = *state {
                return cause;
            }
        }
    }
    // Source dropped without firing, or no trigger at all.
    std::future::pending().await
}
