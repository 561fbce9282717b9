//! Prelude module for convenient imports

// Caches
pub use crate::cache::{CallFuture, Outcome, Sink, Teardown};
// Core
pub use crate::emitter::{Emitter, EmitterBuilder};
// Errors
pub use crate::error::{BoxError, CallError, EmitterError, EmitterResult};
pub use crate::event::{EventName, Token, Topic};
pub use crate::fork::Fork;
pub use crate::listener::{Listener, ListenerFuture, Signal};
pub use crate::registry::Subscription;
// Schedulers
#[cfg(feature = "futures-scheduler")]
pub use crate::scheduler::ThreadPoolScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use crate::scheduler::TokioScheduler;
pub use crate::scheduler::{NoScheduler, Scheduler};
pub use crate::token::{SequentialTokens, TokenSupplier, UuidTokens};
