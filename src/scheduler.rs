//! Where detached work runs.
//!
//! The emitter never blocks on work it does not own: async listener bodies
//! under `emit_sync`, single-flight producers, shared-subscription establish
//! and teardown, and `Sink::emit` dispatches are all handed to a
//! [`Scheduler`]. The scheduler is injected through
//! [`EmitterBuilder::scheduler`](crate::emitter::EmitterBuilder::scheduler);
//! the default is selected by cargo features:
//!
//! - **`tokio-scheduler`** (default): [`TokioScheduler`]
//! - **`futures-scheduler`**: [`ThreadPoolScheduler`], used when tokio is not
//!   enabled
//!
//! Without either feature the default is [`NoScheduler`], which refuses
//! everything.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::{EmitterError, EmitterResult};

#[cfg(feature = "futures-scheduler")]
mod thread_pool_scheduler;
#[cfg(feature = "tokio-scheduler")]
mod tokio_scheduler;

#[cfg(feature = "futures-scheduler")]
pub use thread_pool_scheduler::ThreadPoolScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use tokio_scheduler::TokioScheduler;

/// Runs detached tasks to completion.
pub trait Scheduler: Send + Sync {
  /// Starts `task` without waiting for it. An error means the task was
  /// dropped unstarted.
  fn spawn(&self, task: BoxFuture<'static, ()>) -> EmitterResult<()>;
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
  #[inline]
  fn spawn(&self, task: BoxFuture<'static, ()>) -> EmitterResult<()> { (**self).spawn(task) }
}

/// Refuses every task.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoScheduler;

impl Scheduler for NoScheduler {
  fn spawn(&self, _task: BoxFuture<'static, ()>) -> EmitterResult<()> {
    Err(EmitterError::NoScheduler)
  }
}

#[cfg(feature = "tokio-scheduler")]
pub(crate) fn default_scheduler() -> Arc<dyn Scheduler> { Arc::new(TokioScheduler::default()) }

#[cfg(all(feature = "futures-scheduler", not(feature = "tokio-scheduler")))]
pub(crate) fn default_scheduler() -> Arc<dyn Scheduler> {
  match ThreadPoolScheduler::shared() {
    Some(scheduler) => Arc::new(scheduler),
    None => Arc::new(NoScheduler),
  }
}

#[cfg(not(any(feature = "tokio-scheduler", feature = "futures-scheduler")))]
pub(crate) fn default_scheduler() -> Arc<dyn Scheduler> { Arc::new(NoScheduler) }

#[cfg(test)]
mod test {
  use futures::FutureExt;

  use super::*;

  #[test]
  fn no_scheduler_refuses() {
    let res = NoScheduler.spawn(async {}.boxed());
    assert!(matches!(res, Err(EmitterError::NoScheduler)));
  }
}
