//! Publishers that are driven from the outside.
//!
//! A subject fans one externally sent stream out to any number of
//! subscribers, each with its own demand. Its completion is latched: late
//! subscribers get it straight away.

use crate::{completion::Completion, publisher::Publisher, subscription::SharedSubscription};

mod current_value;
mod hub;
mod passthrough;
mod subject_subscriber;

pub use current_value::CurrentValueSubject;
pub use passthrough::PassthroughSubject;
pub use subject_subscriber::SubjectSubscriber;

/// A publisher you can push values into.
pub trait Subject: Publisher + Clone + Send + Sync + 'static {
  /// Broadcasts `value` to every subscriber that has demand for it.
  fn send(&self, value: Self::Output);

  /// Completes every subscriber, now and in the future.
  fn send_completion(&self, completion: Completion<Self::Failure>);

  /// Attaches an upstream feeding this subject. It is asked for unlimited
  /// values.
  fn send_subscription(&self, subscription: SharedSubscription);
}
