//! Callback handles stored in the registry.
//!
//! A [`Listener`] wraps a one-argument callback. Its body is either
//! synchronous (runs to completion inside the dispatch) or asynchronous
//! (returns a future that `emit_async` awaits and `emit_sync` detaches).
//! Listeners are cheap to clone; clones share identity, which is what
//! [`Emitter::has_callback`](crate::emitter::Emitter::has_callback) compares.
//!
//! A [`Signal`] is the payload-less callback of lifecycle topics.

use std::{
  fmt::{Debug, Formatter},
  future::Future,
  sync::Arc,
};

use futures::future::{BoxFuture, FutureExt};

use crate::error::BoxError;

/// Future returned by an async listener body.
pub type ListenerFuture = BoxFuture<'static, Result<(), BoxError>>;

type SyncBody<T> = Arc<dyn Fn(T) + Send + Sync>;
type AsyncBody<T> = Arc<dyn Fn(T) -> ListenerFuture + Send + Sync>;

enum Body<T> {
  Sync(SyncBody<T>),
  Async(AsyncBody<T>),
}

/// A shareable event callback.
pub struct Listener<T>(Body<T>);

impl<T> Listener<T> {
  /// A listener whose body completes synchronously.
  pub fn new<F>(f: F) -> Self
  where
    F: Fn(T) + Send + Sync + 'static,
  {
    Self(Body::Sync(Arc::new(f)))
  }

  /// A listener whose body returns a future.
  pub fn new_async<F, Fut>(f: F) -> Self
  where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
  {
    Self(Body::Async(Arc::new(move |payload| f(payload).boxed())))
  }

  pub fn is_async(&self) -> bool { matches!(self.0, Body::Async(_)) }

  /// Whether both handles point at the same callback.
  pub fn ptr_eq(&self, other: &Self) -> bool {
    match (&self.0, &other.0) {
      (Body::Sync(a), Body::Sync(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
      (Body::Async(a), Body::Async(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
      _ => false,
    }
  }

  /// Runs the synchronous part of the body. Async bodies hand back the
  /// future that carries the rest.
  pub(crate) fn call(&self, payload: T) -> Option<ListenerFuture> {
    match &self.0 {
      Body::Sync(f) => {
        f(payload);
        None
      }
      Body::Async(f) => Some(f(payload)),
    }
  }
}

impl<T> Clone for Listener<T> {
  fn clone(&self) -> Self {
    match &self.0 {
      Body::Sync(f) => Self(Body::Sync(f.clone())),
      Body::Async(f) => Self(Body::Async(f.clone())),
    }
  }
}

impl<T> Debug for Listener<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Listener").field("is_async", &self.is_async()).finish()
  }
}

/// Payload-less lifecycle callback.
#[derive(Clone)]
pub struct Signal(Arc<dyn Fn() + Send + Sync>);

impl Signal {
  pub fn new<F>(f: F) -> Self
  where
    F: Fn() + Send + Sync + 'static,
  {
    Self(Arc::new(f))
  }

  pub(crate) fn call(&self) { (self.0)() }
}

impl Debug for Signal {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str("Signal") }
}

#[cfg(test)]
mod test {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;

  #[test]
  fn clones_share_identity() {
    let listener = Listener::new(|_: i32| {});
    let other = Listener::new(|_: i32| {});

    assert!(listener.ptr_eq(&listener.clone()));
    assert!(!listener.ptr_eq(&other));
  }

  #[test]
  fn sync_body_runs_inline() {
    let hits = Arc::new(AtomicUsize::new(0));
    let c_hits = hits.clone();
    let listener = Listener::new(move |v: usize| {
      c_hits.fetch_add(v, Ordering::SeqCst);
    });

    assert!(listener.call(3).is_none());
    assert_eq!(hits.load(Ordering::SeqCst), 3);
  }

  #[test]
  fn async_body_is_deferred() {
    let hits = Arc::new(AtomicUsize::new(0));
    let c_hits = hits.clone();
    let listener = Listener::new_async(move |v: usize| {
      let hits = c_hits.clone();
      async move {
        hits.fetch_add(v, Ordering::SeqCst);
        Ok(())
      }
    });

    let fut = listener.call(5).expect("async listener returns a future");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    futures::executor::block_on(fut).unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 5);
  }
}
