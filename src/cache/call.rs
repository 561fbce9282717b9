use std::{
  future::Future,
  panic::{catch_unwind, AssertUnwindSafe},
  pin::Pin,
  task::{Context, Poll},
};

use futures::{channel::oneshot, future::FutureExt, ready};
use parking_lot::Mutex;
use pin_project_lite::pin_project;
use tracing::{debug, trace, warn};

use crate::{
  emitter::Emitter,
  error::CallError,
  event::{EventName, Topic},
  listener::Listener,
  registry::{Handler, Subscription},
};

/// What a flight broadcasts to its callers.
pub type Outcome<R, E> = Result<R, CallError<E>>;

pin_project! {
  /// Resolves to the outcome of the flight this call joined.
  #[must_use = "the outcome is lost if the future is dropped"]
  pub struct CallFuture<R, E> {
    #[pin]
    rx: oneshot::Receiver<Outcome<R, E>>,
  }
}

impl<R, E> Future for CallFuture<R, E> {
  type Output = Outcome<R, E>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.project();
    match ready!(this.rx.poll(cx)) {
      Ok(outcome) => Poll::Ready(outcome),
      Err(oneshot::Canceled) => Poll::Ready(Err(CallError::Abandoned)),
    }
  }
}

impl<R, E> Emitter<Outcome<R, E>>
where
  R: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  /// Runs `producer` at most once at a time per `key`.
  ///
  /// If no flight is pending for `key`, this call starts one: `producer` runs
  /// on the scheduler and its outcome is broadcast on `key`. Calls made while
  /// a flight is pending join it instead and `producer` is dropped. Every
  /// caller of one flight receives a clone of the same outcome; a failed
  /// producer yields [`CallError::Failed`] for all of them.
  ///
  /// The call joins its flight when `cache_call` runs, not when the future is
  /// first polled. Once the outcome is broadcast the key is free again and
  /// the next call starts a new flight.
  ///
  /// ```rust
  /// # #[tokio::main(flavor = "current_thread")]
  /// # async fn main() {
  /// use cached_emitter::prelude::*;
  ///
  /// let calls = Emitter::<Outcome<u32, String>>::new();
  ///
  /// let first = calls.cache_call("answer", || async { Ok(42) });
  /// // Joins the pending flight; this producer never runs.
  /// let second = calls.cache_call("answer", || async { Ok(0) });
  ///
  /// assert_eq!(first.await, Ok(42));
  /// assert_eq!(second.await, Ok(42));
  /// # }
  /// ```
  pub fn cache_call<P, Fut>(&self, key: impl Into<EventName>, producer: P) -> CallFuture<R, E>
  where
    P: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
  {
    let key = key.into();
    let (tx, rx) = oneshot::channel();
    let tx = Mutex::new(Some(tx));
    let waiter = Listener::new(move |outcome| {
      if let Some(tx) = tx.lock().take() {
        // The caller may have dropped its future.
        let _ = tx.send(outcome);
      }
    });

    let token = self.next_token();
    let leader = {
      let mut registry = self.registry();
      let topic = Topic::Event(key.clone());
      let leader = !registry.contains_topic(&topic);
      registry.insert(Subscription::new(topic, token.clone(), Handler::Data(waiter), true));
      leader
    };
    trace!(%key, %token, leader, "join flight");

    if leader {
      debug!(%key, "flight started");
      let emitter = self.clone();
      let flight = key.clone();
      let task = async move {
        let outcome = produce(producer).await;
        debug!(key = %flight, ok = outcome.is_ok(), "flight finished");
        if let Err(err) = emitter.emit_async(flight, outcome).await {
          warn!(%err, "failed to broadcast flight outcome");
        }
      };
      if let Err(err) = self.scheduler().spawn(task.boxed()) {
        warn!(%key, %err, "flight could not be scheduled");
        // Waiters are sync listeners: they are resolved by the call itself.
        drop(self.emit_async(key, Err(CallError::Unscheduled)));
      }
    }

    CallFuture { rx }
  }
}

async fn produce<P, Fut, R, E>(producer: P) -> Outcome<R, E>
where
  P: FnOnce() -> Fut,
  Fut: Future<Output = Result<R, E>>,
{
  let fut = match catch_unwind(AssertUnwindSafe(producer)) {
    Ok(fut) => fut,
    Err(_) => {
      warn!("producer panicked");
      return Err(CallError::Panicked);
    }
  };
  match AssertUnwindSafe(fut).catch_unwind().await {
    Ok(res) => res.map_err(CallError::Failed),
    Err(_) => {
      warn!("producer panicked while running");
      Err(CallError::Panicked)
    }
  }
}
