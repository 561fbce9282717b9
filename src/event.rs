//! Event vocabulary: names, tokens and topics.
//!
//! User events are addressed by an [`EventName`]. Lifecycle signals live in
//! their own namespace ([`Topic::Unsubscribed`] / [`Topic::UnsubscribedAll`]),
//! so a user event called `"unsubscribed:abc"` can never be confused with the
//! signal fired when the subscription `abc` goes away.

use std::{
  fmt::{Display, Formatter},
  num::TryFromIntError,
  sync::Arc,
};

/// Identifier of a user event. Event names are either text or integers; the
/// two never compare equal, even when they print the same.
///
/// Integer names are stored as `i64`. Types that always fit convert with
/// `From`; `u64`, `usize`, `isize`, `i128` and `u128` convert with `TryFrom`,
/// which fails outside the `i64` range.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventName {
  Text(String),
  Number(i64),
}

impl Display for EventName {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      EventName::Text(text) => f.write_str(text),
      EventName::Number(number) => write!(f, "{number}"),
    }
  }
}

impl From<&str> for EventName {
  fn from(name: &str) -> Self { EventName::Text(name.to_owned()) }
}

impl From<String> for EventName {
  fn from(name: String) -> Self { EventName::Text(name) }
}

impl From<&String> for EventName {
  fn from(name: &String) -> Self { EventName::Text(name.clone()) }
}

impl From<&EventName> for EventName {
  fn from(name: &EventName) -> Self { name.clone() }
}

macro_rules! impl_number_name {
  ($($ty:ty),*) => {
    $(
      impl From<$ty> for EventName {
        fn from(name: $ty) -> Self { EventName::Number(i64::from(name)) }
      }
    )*
  };
}

impl_number_name!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! impl_try_number_name {
  ($($ty:ty),*) => {
    $(
      impl TryFrom<$ty> for EventName {
        type Error = TryFromIntError;

        fn try_from(name: $ty) -> Result<Self, Self::Error> {
          i64::try_from(name).map(EventName::Number)
        }
      }
    )*
  };
}

impl_try_number_name!(u64, usize, isize, i128, u128);

/// Opaque handle of one subscription, used to remove exactly that
/// subscription.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(Arc<str>);

impl Token {
  pub fn new(token: impl Into<Arc<str>>) -> Self { Self(token.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl Display for Token {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(&self.0) }
}

/// What a subscription listens to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
  /// A user event.
  Event(EventName),
  /// Fired after `off(token)`, whether or not the token matched.
  Unsubscribed(Token),
  /// Fired when the last subscription of a user event goes away, and on
  /// every `off_event`.
  UnsubscribedAll(EventName),
}

impl Topic {
  /// The user event name, if this is not a lifecycle topic.
  pub fn event_name(&self) -> Option<&EventName> {
    match self {
      Topic::Event(name) => Some(name),
      _ => None,
    }
  }

  pub fn is_lifecycle(&self) -> bool { !matches!(self, Topic::Event(_)) }
}

impl Display for Topic {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Topic::Event(name) => write!(f, "{name}"),
      Topic::Unsubscribed(token) => write!(f, "unsubscribed:{token}"),
      Topic::UnsubscribedAll(name) => write!(f, "unsubscribed-all:{name}"),
    }
  }
}
