use std::{
  collections::VecDeque,
  fmt::{Debug, Formatter},
};

use smallvec::SmallVec;

use crate::{
  event::{EventName, Token, Topic},
  listener::{Listener, Signal},
};

pub(crate) enum Handler<T> {
  Data(Listener<T>),
  Signal(Signal),
}

impl<T> Clone for Handler<T> {
  fn clone(&self) -> Self {
    match self {
      Handler::Data(listener) => Handler::Data(listener.clone()),
      Handler::Signal(signal) => Handler::Signal(signal.clone()),
    }
  }
}

/// One registered callback.
///
/// Subscriptions are handed out by
/// [`Emitter::subscriptions`](crate::emitter::Emitter::subscriptions) and to
/// [`Fork::fork_with`](crate::fork::Fork::fork_with) filters. Cloning is
/// shallow: the clone shares the callback.
pub struct Subscription<T> {
  topic: Topic,
  token: Token,
  handler: Handler<T>,
  once: bool,
}

impl<T> Subscription<T> {
  pub(crate) fn new(topic: Topic, token: Token, handler: Handler<T>, once: bool) -> Self {
    Self { topic, token, handler, once }
  }

  pub fn topic(&self) -> &Topic { &self.topic }

  pub fn token(&self) -> &Token { &self.token }

  /// The user event name; `None` for lifecycle subscriptions.
  pub fn event_name(&self) -> Option<&EventName> { self.topic.event_name() }

  /// The data callback; `None` for lifecycle subscriptions.
  pub fn listener(&self) -> Option<&Listener<T>> {
    match &self.handler {
      Handler::Data(listener) => Some(listener),
      Handler::Signal(_) => None,
    }
  }

  /// Removed by the first dispatch that reaches it.
  pub fn is_once(&self) -> bool { self.once }
}

impl<T> Clone for Subscription<T> {
  fn clone(&self) -> Self {
    Self {
      topic: self.topic.clone(),
      token: self.token.clone(),
      handler: self.handler.clone(),
      once: self.once,
    }
  }
}

impl<T> Debug for Subscription<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription")
      .field("topic", &self.topic)
      .field("token", &self.token)
      .field("once", &self.once)
      .finish()
  }
}

/// Callbacks selected by one dispatch.
///
/// `listeners` is the snapshot of the dispatched topic, in insertion order.
/// `signals` are the lifecycle callbacks owed because one-shot subscriptions
/// left the registry while the snapshot was taken.
pub(crate) struct Dispatch<T> {
  pub(crate) listeners: SmallVec<[Listener<T>; 2]>,
  pub(crate) signals: Vec<Signal>,
}

impl<T> Default for Dispatch<T> {
  fn default() -> Self { Self { listeners: SmallVec::new(), signals: Vec::new() } }
}

/// Ordered subscription list.
///
/// The registry never runs callbacks; it only decides which callbacks a
/// mutation owes. Every method that removes subscriptions returns the
/// lifecycle signals to fire, computed in the same call so that callers
/// holding the registry lock see removal, remaining-count check and signal
/// snapshot as one step.
pub(crate) struct Registry<T> {
  items: Vec<Subscription<T>>,
}

impl<T> Default for Registry<T> {
  fn default() -> Self { Self { items: Vec::new() } }
}

impl<T> Registry<T> {
  #[inline]
  pub fn insert(&mut self, subscription: Subscription<T>) { self.items.push(subscription); }

  #[inline]
  pub fn len(&self) -> usize { self.items.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  pub fn snapshot(&self) -> Vec<Subscription<T>> { self.items.clone() }

  pub fn replace(&mut self, items: Vec<Subscription<T>>) { self.items = items; }

  pub fn clear(&mut self) { self.items.clear(); }

  pub fn contains_token(&self, token: &Token) -> bool {
    self.items.iter().any(|s| &s.token == token)
  }

  pub fn contains_topic(&self, topic: &Topic) -> bool {
    self.items.iter().any(|s| &s.topic == topic)
  }

  pub fn contains_listener(&self, listener: &Listener<T>) -> bool {
    self
      .items
      .iter()
      .any(|s| s.listener().is_some_and(|l| l.ptr_eq(listener)))
  }

  /// Removes the subscription with `token` and returns the signals owed:
  /// `unsubscribed:<token>` always, `unsubscribed-all:<name>` when the
  /// removed subscription was the last one of its event.
  pub fn detach(&mut self, token: &Token) -> Vec<Signal> {
    let removed = self
      .items
      .iter()
      .position(|s| &s.token == token)
      .map(|pos| self.items.remove(pos));

    let mut queue = VecDeque::from([Topic::Unsubscribed(token.clone())]);
    if let Some(Topic::Event(name)) = removed.map(|s| s.topic) {
      self.push_if_emptied(&mut queue, name);
    }
    self.drain_signals(queue)
  }

  /// Removes every subscription of `name`; `unsubscribed-all:<name>` is owed
  /// whether or not anything was removed.
  pub fn detach_event(&mut self, name: &EventName) -> Vec<Signal> {
    let topic = Topic::Event(name.clone());
    self.items.retain(|s| s.topic != topic);
    self.drain_signals(VecDeque::from([Topic::UnsubscribedAll(name.clone())]))
  }

  /// Snapshots the data listeners of `topic`. One-shot subscriptions among
  /// them leave the registry here and their lifecycle signals are collected.
  pub fn take(&mut self, topic: &Topic) -> Dispatch<T> {
    let (handlers, removed) = self.collect(topic);

    let mut queue: VecDeque<_> =
      removed.into_iter().map(|s| Topic::Unsubscribed(s.token)).collect();
    if !queue.is_empty() {
      if let Topic::Event(name) = topic {
        self.push_if_emptied(&mut queue, name.clone());
      }
    }

    let listeners = handlers
      .into_iter()
      .filter_map(|h| match h {
        Handler::Data(listener) => Some(listener),
        Handler::Signal(_) => None,
      })
      .collect();
    Dispatch { listeners, signals: self.drain_signals(queue) }
  }

  fn collect(&mut self, topic: &Topic) -> (SmallVec<[Handler<T>; 2]>, Vec<Subscription<T>>) {
    let handlers = self
      .items
      .iter()
      .filter(|s| &s.topic == topic)
      .map(|s| s.handler.clone())
      .collect();

    let mut removed = Vec::new();
    let mut idx = 0;
    while idx < self.items.len() {
      if self.items[idx].once && &self.items[idx].topic == topic {
        removed.push(self.items.remove(idx));
      } else {
        idx += 1;
      }
    }
    (handlers, removed)
  }

  fn push_if_emptied(&self, queue: &mut VecDeque<Topic>, name: EventName) {
    if !self.contains_topic(&Topic::Event(name.clone())) {
      queue.push_back(Topic::UnsubscribedAll(name));
    }
  }

  /// Resolves queued lifecycle topics into signals. One-shot lifecycle
  /// subscriptions consumed on the way owe their own `unsubscribed:<token>`.
  fn drain_signals(&mut self, mut queue: VecDeque<Topic>) -> Vec<Signal> {
    let mut signals = Vec::new();
    while let Some(topic) = queue.pop_front() {
      let (handlers, removed) = self.collect(&topic);
      signals.extend(handlers.into_iter().filter_map(|h| match h {
        Handler::Signal(signal) => Some(signal),
        Handler::Data(_) => None,
      }));
      queue.extend(removed.into_iter().map(|s| Topic::Unsubscribed(s.token)));
    }
    signals
  }
}
