use std::sync::Mutex;

use crate::{
  completion::Completion,
  demand::Demand,
  rc::{lock, MutArc},
  subscriber::Subscriber,
  subscription::{Cancellable, SharedSubscription, SubscriptionState},
  Never,
};

/// Writes every received value into a shared root object.
///
/// The setter picks the field, e.g. `|model: &mut Model, v| model.title = v`.
/// Only never-failing publishers can be assigned.
pub struct Assign<R, I> {
  state: Mutex<SubscriptionState>,
  root: MutArc<R>,
  setter: Box<dyn Fn(&mut R, I) + Send + Sync>,
}

impl<R, I> Assign<R, I> {
  pub fn new<F>(root: MutArc<R>, setter: F) -> Self
  where
    F: Fn(&mut R, I) + Send + Sync + 'static,
  {
    Assign {
      state: Mutex::new(SubscriptionState::Pending),
      root,
      setter: Box::new(setter),
    }
  }
}

impl<R, I> Subscriber for Assign<R, I>
where
  R: Send + 'static,
  I: Send + 'static,
{
  type Input = I;
  type Failure = Never;

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
      (self.setter)(&mut self.root.rc_deref_mut(), input);
    }
    Demand::NONE
  }

  fn receive_completion(&self, _: Completion<Never>) {
    let mut state = lock(&self.state);
    if state.receive_completion(true) {
      *state = SubscriptionState::Cancelled;
    }
  }
}

impl<R, I> Cancellable for Assign<R, I> {
  fn cancel(&self) {
    let upstream = lock(&self.state).cancel();
    if let Some(upstream) = upstream {
      upstream.cancel();
    }
  }
}
