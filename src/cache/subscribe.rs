use std::{
  fmt::{Debug, Formatter},
  future::Future,
  sync::{Arc, Weak},
};

use futures::{channel::oneshot, future::FutureExt};
use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use crate::{
  emitter::{Emitter, Inner},
  error::{BoxError, EmitterResult},
  event::{EventName, Token, Topic},
  listener::{Listener, Signal},
  registry::{Handler, Subscription},
  scheduler::Scheduler,
};

type Established = Result<Teardown, BoxError>;

/// Releases a shared resource. Runs at most once.
pub struct Teardown(Box<dyn FnOnce() + Send>);

impl Teardown {
  pub fn new<F>(f: F) -> Self
  where
    F: FnOnce() + Send + 'static,
  {
    Self(Box::new(f))
  }

  /// A teardown that does nothing, for resources that stop on their own.
  pub fn noop() -> Self { Self::new(|| {}) }

  pub(crate) fn run(self) { (self.0)() }
}

impl Debug for Teardown {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str("Teardown") }
}

/// Where a shared resource delivers its values.
///
/// Every value is broadcast on the subscription key to whoever is joined at
/// that moment. A sink belongs to one establish cycle of its key: once that
/// cycle's release hook has left the registry (last joiner gone, `off_event`
/// or `off_all`), delivery becomes a no-op, also for joiners of a later
/// cycle. The sink does not keep the emitter alive.
pub struct Sink<T> {
  emitter: Weak<Inner<T>>,
  key: EventName,
  cycle: Token,
}

impl<T> Sink<T> {
  pub fn key(&self) -> &EventName { &self.key }

  /// Whether values sent now would be dropped.
  pub fn is_closed(&self) -> bool {
    Emitter::upgrade(&self.emitter).map_or(true, |emitter| !emitter.has(&self.cycle))
  }
}

impl<T: Clone + Send + 'static> Sink<T> {
  /// Broadcasts `value` without waiting for async listener bodies.
  pub fn emit(&self, value: T) {
    let Some(emitter) = Emitter::upgrade(&self.emitter) else { return };
    let key = self.key.clone();
    let dispatch = emitter.emit_async_in(key.clone(), value, Some(&self.cycle));
    emitter.detach(async move {
      if let Err(err) = dispatch.await {
        warn!(%key, %err, "shared subscription listener failed");
      }
    });
  }

  /// Broadcasts `value`; the future waits for every listener.
  pub fn send(&self, value: T) -> impl Future<Output = EmitterResult<()>> + Send + 'static {
    let dispatch = Emitter::upgrade(&self.emitter)
      .map(|emitter| emitter.emit_async_in(self.key.clone(), value, Some(&self.cycle)));
    async move {
      match dispatch {
        Some(dispatch) => dispatch.await,
        None => Ok(()),
      }
    }
  }
}

impl<T> Clone for Sink<T> {
  fn clone(&self) -> Self {
    Self {
      emitter: self.emitter.clone(),
      key: self.key.clone(),
      cycle: self.cycle.clone(),
    }
  }
}

impl<T> Debug for Sink<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Sink")
      .field("key", &self.key)
      .field("closed", &self.is_closed())
      .finish()
  }
}

impl<T: Clone + Send + 'static> Emitter<T> {
  /// Joins the shared subscription of `key` with `on_data`.
  ///
  /// The first joiner runs `establish` on the scheduler with a [`Sink`] for
  /// the key; later joiners ride the same resource and their `establish` is
  /// dropped. Leave with [`off`](Emitter::off) on the returned token. When the
  /// last joiner leaves (or [`off_event`](Emitter::off_event) clears the
  /// key), the [`Teardown`] returned by `establish` runs once, after
  /// `establish` has finished. The next joiner starts over.
  ///
  /// A failed `establish` is logged. Joiners stay subscribed but receive
  /// nothing, and there is nothing to tear down.
  pub fn cache_subscribe<S, Fut>(
    &self,
    key: impl Into<EventName>,
    establish: S,
    on_data: Listener<T>,
  ) -> Token
  where
    S: FnOnce(Sink<T>) -> Fut + Send + 'static,
    Fut: Future<Output = Established> + Send + 'static,
  {
    let key = key.into();
    let token = self.next_token();
    let hook_token = self.next_token();

    let first = {
      let mut registry = self.registry();
      let topic = Topic::Event(key.clone());
      let first = !registry.contains_topic(&topic);
      registry.insert(Subscription::new(topic, token.clone(), Handler::Data(on_data), false));
      if first {
        let (tx, rx) = oneshot::channel();
        let hook = release_hook(self.scheduler().clone(), key.clone(), rx);
        registry.insert(Subscription::new(
          Topic::UnsubscribedAll(key.clone()),
          hook_token.clone(),
          Handler::Signal(hook),
          true,
        ));
        Some(tx)
      } else {
        None
      }
    };
    trace!(%key, %token, first = first.is_some(), "join shared subscription");

    if let Some(tx) = first {
      debug!(%key, "establishing shared subscription");
      let sink = Sink { emitter: self.downgrade(), key: key.clone(), cycle: hook_token };
      self.detach(async move {
        let established = establish(sink).await;
        match &established {
          Ok(_) => debug!(%key, "shared subscription established"),
          Err(err) => error!(%key, %err, "failed to establish shared subscription"),
        }
        // The receiver is gone only if the hook was cleared by `off_all`.
        let _ = tx.send(established);
      });
    }
    token
  }
}

/// The one-shot `unsubscribed-all:<key>` hook owning a pending teardown.
fn release_hook(
  scheduler: Arc<dyn Scheduler>,
  key: EventName,
  rx: oneshot::Receiver<Established>,
) -> Signal {
  let rx = Mutex::new(Some(rx));
  Signal::new(move || {
    let Some(rx) = rx.lock().take() else { return };
    debug!(%key, "releasing shared subscription");

    let task_key = key.clone();
    let task = async move {
      let key = task_key;
      match rx.await {
        Ok(Ok(teardown)) => {
          teardown.run();
          debug!(%key, "shared subscription torn down");
        }
        Ok(Err(_)) | Err(oneshot::Canceled) => {
          debug!(%key, "shared subscription never established");
        }
      }
    };
    if let Err(err) = scheduler.spawn(task.boxed()) {
      warn!(%key, %err, "failed to schedule teardown");
    }
  })
}
