//! Per-item results of a pool run.

/// What happened to one work item.
#[derive(Debug)]
pub enum Outcome {
    /// Never started: the batch was cancelled before this item ran.
    NotAttempted,
    /// The task returned `Ok(())`.
    Succeeded,
    /// The task returned an error, or panicked.
    Failed(anyhow::Error),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded)
    }

    pub fn is_attempted(&self) -> bool {
        !matches!(self, Outcome::NotAttempted)
    }

    pub fn error(&self) -> Option<&anyhow::Error> {
        match self {
            Outcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_error(self) -> Option<anyhow::Error> {
        match self {
            Outcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Counts over an outcome collection. The pool never aggregates on its own;
/// callers use this to decide between "any failure" and "all succeeded".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub not_attempted: usize,
}

impl PoolSummary {
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a Outcome>) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Succeeded => summary.succeeded += 1,
                Outcome::Failed(_) => summary.failed += 1,
                Outcome::NotAttempted => summary.not_attempted += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.not_attempted
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.not_attempted == 0
    }
}
