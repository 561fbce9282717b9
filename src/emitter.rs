//! The emitter: subscription registry plus dispatcher.
//!
//! [`Emitter`] is a cheap, cloneable handle; clones share one registry, the
//! same way clones of a subject share its subscribers.
//!
//! # Dispatch rules
//!
//! - Every dispatch works on a snapshot of the matching subscriptions taken
//!   when it starts. Subscriptions added by a callback are not called in that
//!   dispatch; subscriptions removed by a callback still are.
//! - Callbacks never run while the registry lock is held, so `on`/`off` from
//!   inside a callback is fine.
//! - Within one dispatch, callbacks run in insertion order. Nothing is
//!   guaranteed across different event names.
//!
//! # Lifecycle signals
//!
//! `off(token)` fires `unsubscribed:<token>` (even when the token matched
//! nothing) and, if that removed the last subscription of its event,
//! `unsubscribed-all:<name>`. `off_event(name)` always fires
//! `unsubscribed-all:<name>`. `off_all()` fires nothing.
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//!
//! use cached_emitter::prelude::*;
//!
//! let emitter = Emitter::<i32>::new();
//! let seen = Arc::new(Mutex::new(vec![]));
//!
//! let c_seen = seen.clone();
//! let token = emitter.on("tick", move |v| c_seen.lock().unwrap().push(v));
//!
//! let c_seen = seen.clone();
//! emitter.on_unsubscribe_all("tick", move || c_seen.lock().unwrap().push(-1));
//!
//! emitter.emit_sync("tick", 1);
//! emitter.off(&token);
//! emitter.emit_sync("tick", 2);
//!
//! assert_eq!(*seen.lock().unwrap(), vec![1, -1]);
//! ```

use std::{
  fmt::{Debug, Formatter},
  future::Future,
  sync::{Arc, Weak},
};

use futures::future::{join_all, FutureExt};
use parking_lot::{Mutex, MutexGuard};
use smallvec::SmallVec;
use tracing::{trace, warn};

use crate::{
  error::{EmitterError, EmitterResult},
  event::{EventName, Token, Topic},
  listener::{Listener, ListenerFuture, Signal},
  registry::{Dispatch, Handler, Registry, Subscription},
  scheduler::{default_scheduler, Scheduler},
  token::{TokenSupplier, UuidTokens},
};

pub(crate) struct Inner<T> {
  registry: Mutex<Registry<T>>,
  tokens: Arc<dyn TokenSupplier>,
  scheduler: Arc<dyn Scheduler>,
}

/// Registry of named subscriptions with sync and async dispatch.
pub struct Emitter<T> {
  pub(crate) inner: Arc<Inner<T>>,
}

// ============================================================================
// Construction
// ============================================================================

/// Configures the capabilities an [`Emitter`] depends on.
///
/// ```rust
/// use cached_emitter::prelude::*;
///
/// let emitter = Emitter::<String>::builder()
///   .tokens(SequentialTokens::new("sub"))
///   .build::<String>();
///
/// let token = emitter.on("greet", |_| {});
/// assert_eq!(token.as_str(), "sub-0");
/// ```
#[derive(Default)]
pub struct EmitterBuilder {
  tokens: Option<Arc<dyn TokenSupplier>>,
  scheduler: Option<Arc<dyn Scheduler>>,
}

impl EmitterBuilder {
  /// Token supplier; defaults to [`UuidTokens`].
  pub fn tokens(mut self, tokens: impl TokenSupplier + 'static) -> Self {
    self.tokens = Some(Arc::new(tokens));
    self
  }

  /// Scheduler for detached work; defaults to the feature-selected one.
  pub fn scheduler(mut self, scheduler: impl Scheduler + 'static) -> Self {
    self.scheduler = Some(Arc::new(scheduler));
    self
  }

  pub fn build<T>(self) -> Emitter<T> {
    let tokens: Arc<dyn TokenSupplier> = match self.tokens {
      Some(tokens) => tokens,
      None => Arc::new(UuidTokens),
    };
    Emitter::from_parts(tokens, self.scheduler.unwrap_or_else(default_scheduler))
  }
}

impl<T> Emitter<T> {
  /// An empty emitter with UUID tokens and the default scheduler.
  pub fn new() -> Self { EmitterBuilder::default().build() }

  pub fn builder() -> EmitterBuilder { EmitterBuilder::default() }

  pub(crate) fn from_parts(tokens: Arc<dyn TokenSupplier>, scheduler: Arc<dyn Scheduler>) -> Self {
    Self {
      inner: Arc::new(Inner { registry: Mutex::new(Registry::default()), tokens, scheduler }),
    }
  }

  /// An empty emitter sharing this one's token supplier and scheduler.
  pub(crate) fn new_sibling(&self) -> Self {
    Self::from_parts(self.inner.tokens.clone(), self.inner.scheduler.clone())
  }

  pub(crate) fn downgrade(&self) -> Weak<Inner<T>> { Arc::downgrade(&self.inner) }

  pub(crate) fn upgrade(inner: &Weak<Inner<T>>) -> Option<Self> {
    inner.upgrade().map(|inner| Self { inner })
  }

  pub(crate) fn registry(&self) -> MutexGuard<'_, Registry<T>> { self.inner.registry.lock() }

  pub(crate) fn next_token(&self) -> Token { self.inner.tokens.next_token() }

  pub(crate) fn scheduler(&self) -> &Arc<dyn Scheduler> { &self.inner.scheduler }
}

impl<T> Default for Emitter<T> {
  fn default() -> Self { Self::new() }
}

impl<T> Clone for Emitter<T> {
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<T> Debug for Emitter<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Emitter").field("subscriptions", &self.len()).finish()
  }
}

// ============================================================================
// Registry operations
// ============================================================================

impl<T> Emitter<T> {
  /// Subscribes a synchronous callback to `name`.
  pub fn on<F>(&self, name: impl Into<EventName>, f: F) -> Token
  where
    F: Fn(T) + Send + Sync + 'static,
  {
    self.subscribe(name, Listener::new(f))
  }

  /// Subscribes a callback whose body is a future. `emit_async` awaits it;
  /// `emit_sync` runs it detached on the scheduler.
  pub fn on_async<F, Fut>(&self, name: impl Into<EventName>, f: F) -> Token
  where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), crate::error::BoxError>> + Send + 'static,
  {
    self.subscribe(name, Listener::new_async(f))
  }

  /// Subscribes an existing listener. The same listener may be subscribed
  /// any number of times, under any names.
  pub fn subscribe(&self, name: impl Into<EventName>, listener: Listener<T>) -> Token {
    self.insert(Topic::Event(name.into()), Handler::Data(listener), false)
  }

  /// Subscribes to `unsubscribed:<token>`.
  pub fn on_unsubscribe<F>(&self, token: &Token, f: F) -> Token
  where
    F: Fn() + Send + Sync + 'static,
  {
    self.insert(Topic::Unsubscribed(token.clone()), Handler::Signal(Signal::new(f)), false)
  }

  /// Subscribes to `unsubscribed-all:<name>`.
  pub fn on_unsubscribe_all<F>(&self, name: impl Into<EventName>, f: F) -> Token
  where
    F: Fn() + Send + Sync + 'static,
  {
    self.insert(Topic::UnsubscribedAll(name.into()), Handler::Signal(Signal::new(f)), false)
  }

  pub(crate) fn insert(&self, topic: Topic, handler: Handler<T>, once: bool) -> Token {
    let token = self.next_token();
    trace!(%topic, %token, once, "subscribe");
    self
      .registry()
      .insert(Subscription::new(topic, token.clone(), handler, once));
    token
  }

  /// Removes the subscription with `token`, then fires its lifecycle
  /// signals. Unknown tokens are not an error.
  pub fn off(&self, token: &Token) {
    let signals = self.registry().detach(token);
    trace!(%token, signals = signals.len(), "unsubscribe");
    self.fire(signals);
  }

  /// Removes every subscription of `name` and fires
  /// `unsubscribed-all:<name>`.
  pub fn off_event(&self, name: impl Into<EventName>) {
    let name = name.into();
    let signals = self.registry().detach_event(&name);
    trace!(%name, signals = signals.len(), "unsubscribe event");
    self.fire(signals);
  }

  /// Removes everything, lifecycle subscriptions included, without firing
  /// any signal.
  pub fn off_all(&self) {
    self.registry().clear();
    trace!("unsubscribe all");
  }

  pub fn has(&self, token: &Token) -> bool { self.registry().contains_token(token) }

  pub fn has_event(&self, name: impl Into<EventName>) -> bool {
    self.registry().contains_topic(&Topic::Event(name.into()))
  }

  pub fn has_callback(&self, listener: &Listener<T>) -> bool {
    self.registry().contains_listener(listener)
  }

  /// Number of subscriptions, lifecycle subscriptions included.
  pub fn len(&self) -> usize { self.registry().len() }

  pub fn is_empty(&self) -> bool { self.registry().is_empty() }

  /// All subscriptions in insertion order.
  pub fn subscriptions(&self) -> Vec<Subscription<T>> { self.registry().snapshot() }

  pub(crate) fn replace_subscriptions(&self, subscriptions: Vec<Subscription<T>>) {
    self.registry().replace(subscriptions);
  }

  fn fire(&self, signals: Vec<Signal>) { signals.iter().for_each(Signal::call); }

  /// Hands `task` to the scheduler; a refusal is logged and the task
  /// dropped.
  pub(crate) fn detach(&self, task: impl Future<Output = ()> + Send + 'static) {
    if let Err(err) = self.scheduler().spawn(task.boxed()) {
      warn!(%err, "failed to schedule detached work");
    }
  }
}

// ============================================================================
// Dispatch
// ============================================================================

impl<T: Clone + Send + 'static> Emitter<T> {
  /// Calls every listener of `name` without waiting for async bodies.
  ///
  /// Synchronous bodies run before this returns, in insertion order; a panic
  /// in one stops the rest of the dispatch and unwinds out of this call,
  /// after the lifecycle signals of consumed one-shot subscriptions have
  /// fired. Async bodies run detached and their failures are only logged.
  pub fn emit_sync(&self, name: impl Into<EventName>, payload: T) {
    let name = name.into();
    let Dispatch { listeners, signals } = self.registry().take(&Topic::Event(name.clone()));
    trace!(%name, listeners = listeners.len(), "emit_sync");
    let _owed = Owed(signals);

    for fut in broadcast(listeners, payload) {
      let name = name.clone();
      self.detach(async move {
        if let Err(err) = fut.await {
          warn!(%name, %err, "detached listener failed");
        }
      });
    }
  }

  /// Calls every listener of `name` and returns a future that waits for all
  /// of them.
  ///
  /// The snapshot is taken and the listeners are called when this method
  /// runs, not when the future is first polled. The future resolves after
  /// every async body has finished, with the first failure if any.
  pub fn emit_async(
    &self,
    name: impl Into<EventName>,
    payload: T,
  ) -> impl Future<Output = EmitterResult<()>> + Send + 'static {
    self.emit_async_in(name.into(), payload, None)
  }

  /// `emit_async` that delivers nothing unless `cycle` is still registered,
  /// checked in the same critical section that takes the snapshot.
  pub(crate) fn emit_async_in(
    &self,
    name: EventName,
    payload: T,
    cycle: Option<&Token>,
  ) -> impl Future<Output = EmitterResult<()>> + Send + 'static {
    let Dispatch { listeners, signals } = {
      let mut registry = self.registry();
      match cycle {
        Some(cycle) if !registry.contains_token(cycle) => Dispatch::default(),
        _ => registry.take(&Topic::Event(name.clone())),
      }
    };
    trace!(%name, listeners = listeners.len(), "emit_async");

    let owed = Owed(signals);
    let pending = broadcast(listeners, payload);
    drop(owed);

    async move {
      let mut failure = None;
      for res in join_all(pending).await {
        if let Err(source) = res {
          failure.get_or_insert(source);
        }
      }
      match failure {
        Some(source) => Err(EmitterError::Listener { name, source }),
        None => Ok(()),
      }
    }
  }
}

/// Lifecycle signals owed by one dispatch. They fire when this is dropped,
/// which includes unwinding out of a panicking listener.
struct Owed(Vec<Signal>);

impl Drop for Owed {
  fn drop(&mut self) { self.0.iter().for_each(Signal::call); }
}

/// Calls each listener in order. The payload is cloned for every listener
/// but the last, which receives the moved value.
fn broadcast<T: Clone>(
  listeners: SmallVec<[Listener<T>; 2]>,
  payload: T,
) -> Vec<ListenerFuture> {
  let mut pending = Vec::new();
  let mut iter = listeners.into_iter().peekable();
  while let Some(listener) = iter.next() {
    if iter.peek().is_some() {
      pending.extend(listener.call(payload.clone()));
    } else {
      pending.extend(listener.call(payload));
      break;
    }
  }
  pending
}
