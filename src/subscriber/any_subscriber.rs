use std::{fmt, sync::Arc};

use crate::{
  completion::Completion,
  demand::Demand,
  identifier::CombineIdentifier,
  subscriber::Subscriber,
  subscription::SharedSubscription,
};

/// A type-erased subscriber.
///
/// Wraps any concrete subscriber, or three closures, behind one type so
/// heterogeneous subscribers can be stored together or passed across an
/// API boundary. Clones share the same underlying subscriber.
pub struct AnySubscriber<I: Send + 'static, E: Send + 'static> {
  id: CombineIdentifier,
  inner: Arc<dyn Subscriber<Input = I, Failure = E>>,
}

impl<I, E> AnySubscriber<I, E>
where
  I: Send + 'static,
  E: Send + 'static,
{
  pub fn new<S>(subscriber: S) -> Self
  where
    S: Subscriber<Input = I, Failure = E>,
  {
    AnySubscriber { id: CombineIdentifier::new(), inner: Arc::new(subscriber) }
  }

  /// A subscriber made of closures. The subscription closure decides how
  /// much to request; the value closure returns the extra demand.
  pub fn from_fns<S, V, C>(receive_subscription: S, receive_value: V, receive_completion: C) -> Self
  where
    S: Fn(SharedSubscription) + Send + Sync + 'static,
    V: Fn(I) -> Demand + Send + Sync + 'static,
    C: Fn(Completion<E>) + Send + Sync + 'static,
  {
    Self::new(FnSubscriber {
      receive_subscription,
      receive_value,
      receive_completion,
      _marker: std::marker::PhantomData,
    })
  }

  #[inline]
  pub fn combine_identifier(&self) -> CombineIdentifier { self.id }
}

impl<I: Send + 'static, E: Send + 'static> Clone for AnySubscriber<I, E> {
  fn clone(&self) -> Self { AnySubscriber { id: self.id, inner: self.inner.clone() } }
}

impl<I: Send + 'static, E: Send + 'static> fmt::Debug for AnySubscriber<I, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AnySubscriber").field("id", &self.id).finish()
  }
}

impl<I, E> Subscriber for AnySubscriber<I, E>
where
  I: Send + 'static,
  E: Send + 'static,
{
  type Input = I;
  type Failure = E;

  #[inline]
  fn receive_subscription(&self, subscription: SharedSubscription) {
    self.inner.receive_subscription(subscription)
  }

  #[inline]
  fn receive(&self, input: I) -> Demand { self.inner.receive(input) }

  #[inline]
  fn receive_completion(&self, completion: Completion<E>) { self.inner.receive_completion(completion) }
}

struct FnSubscriber<S, V, C, I, E> {
  receive_subscription: S,
  receive_value: V,
  receive_completion: C,
  _marker: std::marker::PhantomData<fn(I, E)>,
}

impl<S, V, C, I, E> Subscriber for FnSubscriber<S, V, C, I, E>
where
  S: Fn(SharedSubscription) + Send + Sync + 'static,
  V: Fn(I) -> Demand + Send + Sync + 'static,
  C: Fn(Completion<E>) + Send + Sync + 'static,
  I: Send + 'static,
  E: Send + 'static,
{
  type Input = I;
  type Failure = E;

  fn receive_subscription(&self, subscription: SharedSubscription) {
    (self.receive_subscription)(subscription)
  }

  fn receive(&self, input: I) -> Demand { (self.receive_value)(input) }

  fn receive_completion(&self, completion: Completion<E>) { (self.receive_completion)(completion) }
}
