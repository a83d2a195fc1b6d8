use super::{hub::Hub, Subject};
use crate::{
  completion::Completion,
  demand::Demand,
  publisher::Publisher,
  subscriber::{AnySubscriber, Subscriber},
  subscription::SharedSubscription,
};

/// Broadcasts values to the subscribers attached at the time of sending.
///
/// Nothing is replayed: a subscriber only sees values sent while it has
/// outstanding demand. The completion is latched and replayed to late
/// subscribers. Clones are handles to the same subject.
///
/// ```rust
/// use traffic::prelude::*;
///
/// let subject = PassthroughSubject::<i32, Never>::new();
/// subject.send(1);
///
/// let seen = MutArc::own(vec![]);
/// let c_seen = seen.clone();
/// let _c = subject.clone().sink_value(move |v| c_seen.rc_deref_mut().push(v));
/// subject.send(2);
/// subject.send_completion(Completion::Finished);
/// subject.send(3);
/// assert_eq!(seen.get(), vec![2]);
/// ```
pub struct PassthroughSubject<T: Send + 'static, E: Send + 'static> {
  hub: Hub<T, E>,
}

impl<T: Send + 'static, E: Send + 'static> Clone for PassthroughSubject<T, E> {
  fn clone(&self) -> Self { PassthroughSubject { hub: self.hub.clone() } }
}

impl<T, E> PassthroughSubject<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  pub fn new() -> Self { PassthroughSubject { hub: Hub::new(None) } }

  /// Number of attached subscribers.
  pub fn subscriber_count(&self) -> usize { self.hub.subscriber_count() }
}

impl<T, E> Default for PassthroughSubject<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  fn default() -> Self { Self::new() }
}

impl<T, E> Publisher for PassthroughSubject<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  type Output = T;
  type Failure = E;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = T, Failure = E>,
  {
    self.hub.subscribe(AnySubscriber::new(subscriber))
  }
}

impl<T, E> Subject for PassthroughSubject<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  fn send(&self, value: T) { self.hub.send(value) }

  fn send_completion(&self, completion: Completion<E>) { self.hub.send_completion(completion) }

  fn send_subscription(&self, subscription: SharedSubscription) { self.hub.send_subscription(subscription) }
}

impl<T, E> Subscriber for PassthroughSubject<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  type Input = T;
  type Failure = E;

  fn receive_subscription(&self, subscription: SharedSubscription) { self.send_subscription(subscription) }

  fn receive(&self, input: T) -> Demand {
    self.send(input);
    Demand::NONE
  }

  fn receive_completion(&self, completion: Completion<E>) { self.send_completion(completion) }
}
