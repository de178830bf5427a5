//! Bounded worker pool over one shared dispatch channel.

use std::any::Any;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::{AbortHandle, JoinSet};

use crate::cancel::CancelSignal;

use super::error::{PoolError, TaskPanicked};
use super::item::{Task, WorkItem};
use super::outcome::Outcome;

type SharedReceiver = Arc<Mutex<mpsc::Receiver<WorkItem>>>;

/// Run a batch with at most `max_workers` tasks in flight.
///
/// Items are dispatched in input order over a single-slot channel; workers
/// pull until the channel closes or `cancel` fires. Returns one outcome per
/// item, indexed by id. Items that never ran stay `Outcome::NotAttempted`.
/// Tasks already running when `cancel` fires are not interrupted.
pub async fn run_pool(
    cancel: &CancelSignal,
    max_workers: usize,
    items: Vec<WorkItem>,
) -> Result<Vec<Outcome>, PoolError> {
    if max_workers == 0 {
        return Err(PoolError::NoWorkers);
    }
    validate_ids(&items)?;

    let count = items.len();
    let mut outcomes: Vec<Outcome> = (0..count).map(|_| Outcome::NotAttempted).collect();
    if count == 0 {
        return Ok(outcomes);
    }

    let (tx, rx) = mpsc::channel::<WorkItem>(1);
    let rx: SharedReceiver = Arc::new(Mutex::new(rx));
    let num_workers = max_workers.min(count);
    let mut workers = JoinSet::new();
    for worker in 0..num_workers {
        workers.spawn(worker_loop(worker, Arc::clone(&rx), cancel.clone()));
    }
    let dispatcher = tokio::spawn(dispatch(items, tx, cancel.clone()));

    let mut join_error = None;
    while let Some(res) = workers.join_next().await {
        match res {
            Ok(done) => {
                for (id, outcome) in done {
                    if let Some(slot) = outcomes.get_mut(id) {
                        *slot = outcome;
                    }
                }
            }
            Err(e) => {
                join_error.get_or_insert(e);
            }
        }
    }
    let dispatched = dispatcher.await?;
    if let Some(e) = join_error {
        return Err(PoolError::Join(e));
    }

    tracing::debug!(
        items = count,
        dispatched,
        workers = num_workers,
        "pool batch finished"
    );
    Ok(outcomes)
}

fn validate_ids(items: &[WorkItem]) -> Result<(), PoolError> {
    match items.iter().enumerate().find(|(index, item)| item.id != *index) {
        Some((index, item)) => Err(PoolError::IdMismatch { index, id: item.id }),
        None => Ok(()),
    }
}

/// Feed items in order. Stops early on cancellation; dropping `tx` on return
/// closes the channel exactly once, which lets idle workers exit.
async fn dispatch(items: Vec<WorkItem>, tx: mpsc::Sender<WorkItem>, cancel: CancelSignal) -> usize {
    let total = items.len();
    let mut sent = 0usize;
    for item in items {
        tokio::select! {
            biased;
            cause = cancel.cancelled() => {
                tracing::debug!(sent, total, %cause, "dispatch stopped");
                break;
            }
            res = tx.send(item) => {
                if res.is_err() {
                    break;
                }
                sent += 1;
            }
        }
    }
    sent
}

/// Pull and run items until the channel closes or cancellation is observed.
/// Returns the `(id, outcome)` pairs this worker produced.
async fn worker_loop(
    worker: usize,
    rx: SharedReceiver,
    cancel: CancelSignal,
) -> Vec<(usize, Outcome)> {
    let mut done = Vec::new();
    loop {
        let next = {
            let mut rx = rx.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                item = rx.recv() => item,
            }
        };
        let Some(item) = next else {
            break;
        };
        if cancel.is_done() {
            tracing::debug!(worker, id = item.id, "cancelled before start; item skipped");
            break;
        }
        let (id, task) = item.into_parts();
        done.push((id, run_task(id, task, cancel.clone()).await));
    }
    tracing::debug!(worker, ran = done.len(), "worker exiting");
    done
}

/// Aborts the wrapped task when dropped; a no-op once the task has finished.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Run one task on its own tokio task so a panic lands in this item's slot
/// instead of taking the worker down. If the worker itself is dropped (the
/// caller abandoned `run_pool`), the task is aborted with it.
async fn run_task(id: usize, task: Task, cancel: CancelSignal) -> Outcome {
    let handle = tokio::spawn(async move { task(cancel).await });
    let _guard = AbortOnDrop(handle.abort_handle());
    match handle.await {
        Ok(Ok(())) => Outcome::Succeeded,
        Ok(Err(e)) => Outcome::Failed(e),
        Err(join_err) => {
            let message = if join_err.is_panic() {
                panic_message(join_err.into_panic())
            } else {
                join_err.to_string()
            };
            tracing::warn!(id, %message, "task panicked");
            Outcome::Failed(TaskPanicked { id, message }.into())
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
