//! The consumer-to-producer half of the protocol.
//!
//! A [`Subscription`] is handed to a subscriber exactly once. Through it the
//! subscriber pulls more values with [`Subscription::request`] or stops the
//! stream with [`Cancellable::cancel`]. Both calls may arrive from any
//! thread at any time and must be idempotent once the edge is cancelled.

use std::sync::Arc;

use crate::demand::Demand;

pub mod any_cancellable;
pub mod registry;
pub mod state;

pub use any_cancellable::AnyCancellable;
pub use registry::Registry;
pub use state::{InnerCompletion, SubscriptionState};

/// Something that can be told to stop.
pub trait Cancellable {
  fn cancel(&self);
}

/// Lets a subscriber pull values or stop the stream.
pub trait Subscription: Cancellable + Send + Sync {
  /// Adds `demand` to what the subscriber has already asked for.
  fn request(&self, demand: Demand);
}

/// The form in which subscriptions travel through a pipeline.
pub type SharedSubscription = Arc<dyn Subscription>;

impl<T: Cancellable + ?Sized> Cancellable for Arc<T> {
  #[inline]
  fn cancel(&self) { (**self).cancel() }
}

impl<T: Cancellable + ?Sized> Cancellable for Box<T> {
  #[inline]
  fn cancel(&self) { (**self).cancel() }
}

impl<T: Subscription + ?Sized> Subscription for Arc<T> {
  #[inline]
  fn request(&self, demand: Demand) { (**self).request(demand) }
}

/// A subscription that ignores every request and cancel.
///
/// Given to subscribers of publishers that terminate without producing
/// anything, such as an already completed subject.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptySubscription;

impl Cancellable for EmptySubscription {
  fn cancel(&self) {}
}

impl Subscription for EmptySubscription {
  fn request(&self, _: Demand) {}
}

/// A shared [`EmptySubscription`].
pub fn empty() -> SharedSubscription { Arc::new(EmptySubscription) }
