//! Work items: an index-addressed identity plus one unit of fallible async work.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::cancel::CancelSignal;

/// Future returned by a task body.
pub type TaskFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// A task body. Called once with the pool's shared cancellation signal.
pub type Task = Box<dyn FnOnce(CancelSignal) -> TaskFuture + Send + 'static>;

/// One entry of a pool batch. `id` must equal the item's position in the batch;
/// it addresses the outcome slot directly.
pub struct WorkItem {
    pub id: usize,
    task: Task,
}

impl WorkItem {
    pub fn new<F, Fut>(id: usize, task: F) -> Self
    where
        F: FnOnce(CancelSignal) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            id,
            task: Box::new(move |cancel| Box::pin(task(cancel))),
        }
    }

    /// Build a batch from task bodies, numbering them `0..n` in order.
    pub fn batch<I, F, Fut>(tasks: I) -> Vec<WorkItem>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce(CancelSignal) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        tasks
            .into_iter()
            .enumerate()
            .map(|(id, task)| WorkItem::new(id, task))
            .collect()
    }

    pub(super) fn into_parts(self) -> (usize, Task) {
        (self.id, self.task)
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem").field("id", &self.id).finish_non_exhaustive()
    }
}
