//! Deriving new emitters from existing ones.
//!
//! Emitters are shared handles, so `clone()` gives another view of the same
//! registry. Use `fork` to get a new, independent registry seeded with the
//! current subscriptions.
//!
//! ```rust
//! use cached_emitter::prelude::*;
//!
//! let emitter = Emitter::<i32>::new();
//! emitter.on("a", |_| {});
//! emitter.on("b", |_| {});
//!
//! let only_a = emitter.fork_with(|subs| {
//!   subs
//!     .iter()
//!     .filter(|s| s.event_name() == Some(&EventName::from("a")))
//!     .cloned()
//!     .collect::<Vec<_>>()
//! });
//!
//! assert_eq!(only_a.len(), 1);
//! assert_eq!(emitter.len(), 2);
//! ```
//!
//! Types that wrap an [`Emitter`] implement [`Fork`] by naming the inner
//! emitter and how to build an empty instance of themselves; `fork` and
//! `fork_with` then return the wrapper type.

use crate::{emitter::Emitter, registry::Subscription};

pub trait Fork: Sized {
  type Item;

  fn emitter(&self) -> &Emitter<Self::Item>;

  /// An instance with an empty registry, sharing whatever configuration the
  /// original should pass on.
  fn new_empty(&self) -> Self;

  /// A new instance carrying every subscription of this one. Listeners are
  /// shared, not duplicated.
  fn fork(&self) -> Self {
    let forked = self.new_empty();
    forked
      .emitter()
      .replace_subscriptions(self.emitter().subscriptions());
    forked
  }

  /// A new instance carrying whatever `filter` returns. The filter sees the
  /// current subscriptions in order and may return a single subscription
  /// (`Some(s)`, `[s]`) or any collection of them.
  fn fork_with<F, I>(&self, filter: F) -> Self
  where
    F: FnOnce(&[Subscription<Self::Item>]) -> I,
    I: IntoIterator<Item = Subscription<Self::Item>>,
  {
    let current = self.emitter().subscriptions();
    let forked = self.new_empty();
    forked
      .emitter()
      .replace_subscriptions(filter(&current).into_iter().collect());
    forked
  }
}

impl<T> Fork for Emitter<T> {
  type Item = T;

  #[inline]
  fn emitter(&self) -> &Emitter<T> { self }

  #[inline]
  fn new_empty(&self) -> Self { self.new_sibling() }
}
