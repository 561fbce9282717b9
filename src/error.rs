use thiserror::Error;

use crate::event::EventName;

/// Error type of async listener bodies and of `establish` in
/// [`cache_subscribe`](crate::emitter::Emitter::cache_subscribe).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type EmitterResult<T> = Result<T, EmitterError>;

/// Errors raised by the emitter itself.
#[derive(Debug, Error)]
pub enum EmitterError {
  /// An async listener failed during `emit_async`. Only the first failure is
  /// reported, after every listener has finished.
  #[error("listener of `{name}` failed: {source}")]
  Listener {
    name: EventName,
    #[source]
    source: BoxError,
  },

  /// The tokio scheduler was asked to spawn outside of a runtime.
  #[error("no tokio runtime is available to run detached work")]
  NoRuntime,

  /// The executor refused the task.
  #[error("executor refused a task: {0}")]
  Spawn(String),

  /// The crate was built without a scheduler feature and no scheduler was
  /// configured.
  #[error("no scheduler configured; enable `tokio-scheduler` or `futures-scheduler`")]
  NoScheduler,
}

/// Outcome of a single-flight call that did not produce a value.
///
/// Every caller sharing a flight receives a clone of the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError<E> {
  /// The producer returned an error.
  #[error("producer failed: {0}")]
  Failed(E),

  /// The producer panicked, either when called or while being polled.
  #[error("producer panicked")]
  Panicked,

  /// The caller's listener was removed (e.g. by `off_event` or `off_all`)
  /// before the flight broadcast an outcome.
  #[error("flight abandoned before an outcome was broadcast")]
  Abandoned,

  /// The scheduler refused to run the producer.
  #[error("producer could not be scheduled")]
  Unscheduled,
}
