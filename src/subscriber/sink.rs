use std::sync::Mutex;

use crate::{
  completion::Completion,
  demand::Demand,
  rc::lock,
  subscriber::Subscriber,
  subscription::{Cancellable, SharedSubscription, SubscriptionState},
};

type ReceiveValue<I> = Box<dyn Fn(I) + Send + Sync>;
type ReceiveCompletion<E> = Box<dyn Fn(Completion<E>) + Send + Sync>;

/// A subscriber that requests unlimited values and hands every event to a
/// closure.
///
/// Usually created through [`Publisher::sink`](crate::publisher::Publisher::sink),
/// which returns the cancellation handle for it.
pub struct Sink<I, E> {
  state: Mutex<SubscriptionState>,
  receive_value: ReceiveValue<I>,
  receive_completion: ReceiveCompletion<E>,
}

impl<I, E> Sink<I, E> {
  pub fn new<V, C>(receive_completion: C, receive_value: V) -> Self
  where
    V: Fn(I) + Send + Sync + 'static,
    C: Fn(Completion<E>) + Send + Sync + 'static,
  {
    Sink {
      state: Mutex::new(SubscriptionState::Pending),
      receive_value: Box::new(receive_value),
      receive_completion: Box::new(receive_completion),
    }
  }
}

impl<I, E> Subscriber for Sink<I, E>
where
  I: Send + 'static,
  E: Send + 'static,
{
  type Input = I;
  type Failure = E;

  fn receive_subscription(&self, subscription: SharedSubscription) {
    let accepted = lock(&self.state).receive_subscription(subscription.clone());
    if accepted {
      subscription.request(Demand::UNLIMITED);
    } else {
      subscription.cancel();
    }
  }

  fn receive(&self, input: I) -> Demand {
    if lock(&self.state).is_subscribed_and_not_completed() {
      (self.receive_value)(input);
    }
    Demand::NONE
  }

  fn receive_completion(&self, completion: Completion<E>) {
    {
      let mut state = lock(&self.state);
      if !state.receive_completion(completion.is_finished()) {
        return;
      }
      // Terminal: let go of the upstream.
      *state = SubscriptionState::Cancelled;
    }
    (self.receive_completion)(completion);
  }
}

impl<I, E> Cancellable for Sink<I, E> {
  fn cancel(&self) {
    let upstream = lock(&self.state).cancel();
    if let Some(upstream) = upstream {
      upstream.cancel();
    }
  }
}
