use super::{hub::Hub, Subject};
use crate::{
  completion::Completion,
  demand::Demand,
  publisher::Publisher,
  subscriber::{AnySubscriber, Subscriber},
  subscription::SharedSubscription,
};

/// A subject holding a current value.
///
/// A new subscriber receives the current value as soon as it requests
/// anything, even if nothing was sent since it attached. A subscriber that
/// is out of demand keeps only the most recent value for its next request.
///
/// ```rust
/// use traffic::prelude::*;
///
/// let subject = CurrentValueSubject::<i32, Never>::new(1);
/// let seen = MutArc::own(vec![]);
/// let c_seen = seen.clone();
/// let _c = subject.clone().sink_value(move |v| c_seen.rc_deref_mut().push(v));
/// subject.set_value(2);
/// assert_eq!(subject.value(), 2);
/// assert_eq!(seen.get(), vec![1, 2]);
/// ```
pub struct CurrentValueSubject<T: Send + 'static, E: Send + 'static> {
  hub: Hub<T, E>,
}

impl<T: Send + 'static, E: Send + 'static> Clone for CurrentValueSubject<T, E> {
  fn clone(&self) -> Self { CurrentValueSubject { hub: self.hub.clone() } }
}

impl<T, E> CurrentValueSubject<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  pub fn new(value: T) -> Self { CurrentValueSubject { hub: Hub::new(Some(value)) } }

  /// The most recently sent value. Still readable after completion.
  pub fn value(&self) -> T {
    match self.hub.current() {
      Some(value) => value,
      None => unreachable!("a current value subject always holds a value"),
    }
  }

  /// Same as [`Subject::send`].
  pub fn set_value(&self, value: T) { self.hub.send(value) }

  pub fn subscriber_count(&self) -> usize { self.hub.subscriber_count() }
}

impl<T, E> Publisher for CurrentValueSubject<T, E>
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

impl<T, E> Subject for CurrentValueSubject<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  fn send(&self, value: T) { self.hub.send(value) }

  fn send_completion(&self, completion: Completion<E>) { self.hub.send_completion(completion) }

  fn send_subscription(&self, subscription: SharedSubscription) { self.hub.send_subscription(subscription) }
}

impl<T, E> Subscriber for CurrentValueSubject<T, E>
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
