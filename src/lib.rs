//! # cached-emitter: event emitter with single-flight calls and shared subscriptions
//!
//! A thread-safe registry of named subscriptions with synchronous and
//! asynchronous dispatch, lifecycle signals on unsubscription, and two
//! coordination patterns built entirely on those events.
//!
//! ## Quick Start
//!
//! ```rust
//! use cached_emitter::prelude::*;
//!
//! let emitter = Emitter::<u32>::new();
//! let token = emitter.on("tick", |v| println!("tick {v}"));
//!
//! emitter.emit_sync("tick", 1);
//! assert!(emitter.has(&token));
//!
//! emitter.off(&token);
//! assert!(!emitter.has_event("tick"));
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Emitter`] | Shared handle to a subscription registry and its dispatcher |
//! | [`Listener`] | Cloneable callback with identity, sync or async body |
//! | [`Token`] | Handle of one subscription, used to remove it |
//! | [`Fork`] | Derives independent emitters from existing ones |
//! | [`Scheduler`] | Where detached work (async bodies, producers, teardowns) runs |
//!
//! On top of the registry:
//!
//! - [`Emitter::cache_call`]: at most one producer run per key at a time, every
//!   concurrent caller gets the same outcome.
//! - [`Emitter::cache_subscribe`]: one shared resource per key, established by
//!   the first joiner and torn down when the last one leaves.
//!
//! ## Feature Flags
//!
//! - **`tokio-scheduler`** (default): detached work runs on tokio
//! - **`futures-scheduler`**: detached work runs on a `futures` thread pool
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and never installs a subscriber.
//!
//! [`Emitter`]: emitter::Emitter
//! [`Emitter::cache_call`]: emitter::Emitter::cache_call
//! [`Emitter::cache_subscribe`]: emitter::Emitter::cache_subscribe
//! [`Listener`]: listener::Listener
//! [`Token`]: event::Token
//! [`Fork`]: fork::Fork
//! [`Scheduler`]: scheduler::Scheduler

pub mod cache;
pub mod emitter;
pub mod error;
pub mod event;
pub mod fork;
pub mod listener;
pub mod prelude;
pub mod registry;
pub mod scheduler;
pub mod token;

pub use prelude::*;

#[cfg(doctest)]
mod __markdown_doctests {
  mod readme {
    #![doc = include_str!("../README.md")]
  }
}
