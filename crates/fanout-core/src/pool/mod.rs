//! Fixed-size worker pool for one finite batch of independent tasks.
//!
//! A dispatcher feeds items in order into a shared channel; `max_workers`
//! workers pull from it and record one outcome per item, addressed by id.
//! Cancellation is cooperative and checked at pull and dispatch boundaries.

mod error;
mod item;
mod outcome;
mod run;

pub use error::{PoolError, TaskPanicked};
pub use item::{Task, TaskFuture, WorkItem};
pub use outcome::{Outcome, PoolSummary};
pub use run::run_pool;
