//! Token suppliers.
//!
//! The emitter only needs tokens that never collide for the lifetime of a
//! registry. [`UuidTokens`] is the default; [`SequentialTokens`] gives
//! readable, deterministic tokens for tests and debugging.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use crate::event::Token;

/// Source of unique subscription tokens.
pub trait TokenSupplier: Send + Sync {
  fn next_token(&self) -> Token;
}

/// Random UUID v4 tokens.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidTokens;

impl TokenSupplier for UuidTokens {
  fn next_token(&self) -> Token { Token::new(Uuid::new_v4().to_string()) }
}

/// `<prefix>-0`, `<prefix>-1`, ... Unique per supplier instance only.
#[derive(Debug)]
pub struct SequentialTokens {
  prefix: String,
  next: AtomicU64,
}

impl SequentialTokens {
  pub fn new(prefix: impl Into<String>) -> Self {
    Self { prefix: prefix.into(), next: AtomicU64::new(0) }
  }
}

impl Default for SequentialTokens {
  fn default() -> Self { Self::new("sub") }
}

impl TokenSupplier for SequentialTokens {
  fn next_token(&self) -> Token {
    let id = self.next.fetch_add(1, Ordering::Relaxed);
    Token::new(format!("{}-{id}", self.prefix))
  }
}
