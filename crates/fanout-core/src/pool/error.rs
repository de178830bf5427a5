//! Pool precondition failures and the error recorded for a panicking task.

/// Why `run_pool` refused or failed to run a batch.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("max_workers must be > 0")]
    NoWorkers,
    /// Item at `index` carries a different `id`; ids must be `0..len` in order.
    #[error("work item at index {index} has id {id}")]
    IdMismatch { index: usize, id: usize },
    /// A worker or the dispatcher task itself died (runtime shutdown).
    #[error("pool task join: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Recorded in an item's slot when its task panicked instead of returning.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("task {id} panicked: {message}")]
pub struct TaskPanicked {
    pub id: usize,
    pub message: String,
}
