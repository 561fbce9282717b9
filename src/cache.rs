//! Coordination patterns built on the emitter's own events.
//!
//! - [`cache_call`](crate::emitter::Emitter::cache_call): single-flight
//!   execution. Concurrent callers with the same key share one producer run.
//! - [`cache_subscribe`](crate::emitter::Emitter::cache_subscribe): a shared,
//!   reference-counted subscription. The first joiner establishes the
//!   resource, the last one to leave tears it down.
//!
//! Neither keeps a table of its own. A pending flight is a one-shot listener
//! on the key; the reference count of a shared subscription is the set of
//! listeners on the key, and its release is the `unsubscribed-all:<key>`
//! signal.

pub mod call;
pub mod subscribe;

pub use call::{CallFuture, Outcome};
pub use subscribe::{Sink, Teardown};
