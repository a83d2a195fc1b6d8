//! The producer-to-consumer half of the protocol.
//!
//! Per edge a subscriber sees: one subscription, any number of values while
//! the edge is live, then at most one completion. The demand returned from
//! [`Subscriber::receive`] is added to whatever is already outstanding.

use std::sync::Arc;

use crate::{completion::Completion, demand::Demand, subscription::SharedSubscription};

pub mod any_subscriber;
pub mod assign;
pub mod sink;

pub use any_subscriber::AnySubscriber;
pub use assign::Assign;
pub use sink::Sink;

/// Receives a subscription, then values, then one completion.
///
/// All methods take `&self`: a subscriber may be called from the thread
/// that produces values while another thread cancels it, so implementations
/// keep their mutable state behind a lock.
pub trait Subscriber: Send + Sync + 'static {
  type Input: Send + 'static;
  type Failure: Send + 'static;

  fn receive_subscription(&self, subscription: SharedSubscription);

  /// Returns how many more values the subscriber wants on top of what it
  /// already requested.
  fn receive(&self, input: Self::Input) -> Demand;

  fn receive_completion(&self, completion: Completion<Self::Failure>);
}

impl<S: Subscriber + ?Sized> Subscriber for Arc<S> {
  type Input = S::Input;
  type Failure = S::Failure;

  #[inline]
  fn receive_subscription(&self, subscription: SharedSubscription) {
    (**self).receive_subscription(subscription)
  }

  #[inline]
  fn receive(&self, input: Self::Input) -> Demand { (**self).receive(input) }

  #[inline]
  fn receive_completion(&self, completion: Completion<Self::Failure>) {
    (**self).receive_completion(completion)
  }
}

impl<S: Subscriber + ?Sized> Subscriber for Box<S> {
  type Input = S::Input;
  type Failure = S::Failure;

  #[inline]
  fn receive_subscription(&self, subscription: SharedSubscription) {
    (**self).receive_subscription(subscription)
  }

  #[inline]
  fn receive(&self, input: Self::Input) -> Demand { (**self).receive(input) }

  #[inline]
  fn receive_completion(&self, completion: Completion<Self::Failure>) {
    (**self).receive_completion(completion)
  }
}
