use futures::future::BoxFuture;
use tokio::runtime::Handle;

use super::Scheduler;
use crate::error::{EmitterError, EmitterResult};

/// Spawns onto a tokio runtime.
///
/// The default instance looks up the runtime of whichever thread spawns, so
/// an emitter created outside a runtime still works once it is used inside
/// one. Pin a runtime with [`TokioScheduler::new`] or
/// [`TokioScheduler::current`].
#[derive(Clone, Debug, Default)]
pub struct TokioScheduler {
  handle: Option<Handle>,
}

impl TokioScheduler {
  pub fn new(handle: Handle) -> Self { Self { handle: Some(handle) } }

  /// Pins the runtime of the calling context.
  pub fn current() -> EmitterResult<Self> {
    Handle::try_current().map(Self::new).map_err(|_| EmitterError::NoRuntime)
  }
}

impl Scheduler for TokioScheduler {
  fn spawn(&self, task: BoxFuture<'static, ()>) -> EmitterResult<()> {
    let handle = match &self.handle {
      Some(handle) => handle.clone(),
      None => Handle::try_current().map_err(|_| EmitterError::NoRuntime)?,
    };
    // Detached: the join handle is not needed.
    drop(handle.spawn(task));
    Ok(())
  }
}
