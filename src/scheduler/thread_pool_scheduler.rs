use futures::{executor::ThreadPool, future::BoxFuture, task::SpawnExt};
use once_cell::sync::Lazy;
use tracing::error;

use super::Scheduler;
use crate::error::{EmitterError, EmitterResult};

static DEFAULT_POOL: Lazy<Option<ThreadPool>> = Lazy::new(|| match ThreadPool::new() {
  Ok(pool) => Some(pool),
  Err(err) => {
    error!(%err, "failed to create the default thread pool");
    None
  }
});

/// Spawns onto a `futures` thread pool.
#[derive(Clone, Debug)]
pub struct ThreadPoolScheduler {
  pool: ThreadPool,
}

impl ThreadPoolScheduler {
  /// A scheduler on a fresh pool.
  pub fn new() -> EmitterResult<Self> {
    ThreadPool::new()
      .map(Self::from_pool)
      .map_err(|err| EmitterError::Spawn(err.to_string()))
  }

  pub fn from_pool(pool: ThreadPool) -> Self { Self { pool } }

  /// A scheduler on the lazily created process-wide pool; `None` if the pool
  /// could not be created.
  pub fn shared() -> Option<Self> { DEFAULT_POOL.clone().map(Self::from_pool) }
}

impl Scheduler for ThreadPoolScheduler {
  fn spawn(&self, task: BoxFuture<'static, ()>) -> EmitterResult<()> {
    self
      .pool
      .spawn(task)
      .map_err(|err| EmitterError::Spawn(err.to_string()))
  }
}

#[cfg(test)]
mod test {
  use futures::{channel::oneshot, executor::block_on, FutureExt};

  use super::*;

  #[test]
  fn runs_on_pool() {
    let scheduler = ThreadPoolScheduler::new().unwrap();
    let (tx, rx) = oneshot::channel();
    scheduler
      .spawn(
        async move {
          let _ = tx.send("done");
        }
        .boxed(),
      )
      .unwrap();

    assert_eq!(block_on(rx), Ok("done"));
  }

  #[test]
  fn shared_pool_is_reused() {
    assert!(ThreadPoolScheduler::shared().is_some());
  }
}
