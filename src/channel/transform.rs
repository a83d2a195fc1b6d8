use std::sync::{Arc, Mutex, Weak};

use tracing::trace;

use crate::{
  completion::Completion,
  demand::Demand,
  rc::lock,
  subscriber::Subscriber,
  subscription::{Cancellable, SharedSubscription, Subscription, SubscriptionState},
};

/// What a [`Transform`] decided to do with one upstream value.
#[derive(Debug, PartialEq, Eq)]
pub enum Step<T> {
  /// Forward the value and keep going.
  Emit(T),
  /// Drop the value. No extra demand is requested for it.
  Skip,
  /// Drop the value and ask upstream for one more in its place.
  Replenish,
  /// Forward the value, then finish downstream and cancel upstream.
  EmitAndFinish(T),
  /// Finish downstream and cancel upstream.
  Finish,
}

/// The per-operator logic plugged into a [`TransformChannel`].
///
/// `transform` runs under the channel's logic lock, so it may keep
/// accumulators in `self`. An `Err` becomes the downstream's failure and
/// suppresses whatever completion the upstream sends later.
pub trait Transform: Send + 'static {
  type Input: Send + 'static;
  type Output: Send + 'static;
  type Failure: Send + 'static;

  fn transform(&mut self, input: Self::Input) -> Result<Step<Self::Output>, Self::Failure>;

  /// Runs when the upstream finishes normally, before the completion is
  /// forwarded. Accumulating operators flush their final value here.
  fn will_complete(&mut self) -> Result<Option<Self::Output>, Self::Failure> { Ok(None) }

  /// What to ask upstream for when the downstream requests `demand`.
  fn upstream_demand(&self, demand: Demand) -> Demand { demand }
}

/// A channel that maps each upstream value through a [`Transform`].
pub struct TransformChannel<T, D> {
  me: Weak<Self>,
  state: Mutex<SubscriptionState>,
  logic: Mutex<T>,
  downstream: D,
}

impl<T, D> TransformChannel<T, D>
where
  T: Transform,
  D: Subscriber<Input = T::Output, Failure = T::Failure>,
{
  pub fn new(logic: T, downstream: D) -> Arc<Self> {
    Arc::new_cyclic(|me| TransformChannel {
      me: me.clone(),
      state: Mutex::new(SubscriptionState::Pending),
      logic: Mutex::new(logic),
      downstream,
    })
  }

  /// Completes the edge from our side. `false` when it was already over.
  fn terminate(&self, finished: bool) -> bool {
    let mut state = lock(&self.state);
    if !state.is_subscribed_and_not_completed() {
      return false;
    }
    let upstream = state.terminate(finished);
    drop(state);
    if let Some(upstream) = upstream {
      upstream.cancel();
    }
    true
  }
}

impl<T, D> Subscriber for TransformChannel<T, D>
where
  T: Transform,
  D: Subscriber<Input = T::Output, Failure = T::Failure>,
{
  type Input = T::Input;
  type Failure = T::Failure;

  fn receive_subscription(&self, subscription: SharedSubscription) {
    let accepted = lock(&self.state).receive_subscription(subscription.clone());
    if !accepted {
      subscription.cancel();
      return;
    }
    if let Some(me) = self.me.upgrade() {
      self.downstream.receive_subscription(me);
    }
  }

  fn receive(&self, input: T::Input) -> Demand {
    if !lock(&self.state).is_subscribed_and_not_completed() {
      trace!("value dropped: transform channel is not live");
      return Demand::NONE;
    }
    let step = lock(&self.logic).transform(input);
    match step {
      Ok(Step::Emit(value)) => self.downstream.receive(value),
      Ok(Step::Skip) => Demand::NONE,
      Ok(Step::Replenish) => Demand::max(1),
      Ok(Step::EmitAndFinish(value)) => {
        if self.terminate(true) {
          self.downstream.receive(value);
          self.downstream.receive_completion(Completion::Finished);
        }
        Demand::NONE
      }
      Ok(Step::Finish) => {
        if self.terminate(true) {
          self.downstream.receive_completion(Completion::Finished);
        }
        Demand::NONE
      }
      Err(failure) => {
        if self.terminate(false) {
          self.downstream.receive_completion(Completion::Failure(failure));
        }
        Demand::NONE
      }
    }
  }

  fn receive_completion(&self, completion: Completion<T::Failure>) {
    if !lock(&self.state).receive_completion(completion.is_finished()) {
      return;
    }
    match completion {
      Completion::Finished => {
        let flushed = lock(&self.logic).will_complete();
        match flushed {
          Ok(Some(value)) => {
            self.downstream.receive(value);
          }
          Ok(None) => {}
          Err(failure) => {
            self.downstream.receive_completion(Completion::Failure(failure));
            return;
          }
        }
        self.downstream.receive_completion(Completion::Finished);
      }
      failure => self.downstream.receive_completion(failure),
    }
  }
}

impl<T, D> Cancellable for TransformChannel<T, D> {
  fn cancel(&self) {
    let upstream = lock(&self.state).cancel();
    if let Some(upstream) = upstream {
      upstream.cancel();
    }
  }
}

impl<T, D> Subscription for TransformChannel<T, D>
where
  T: Transform,
  D: Subscriber<Input = T::Output, Failure = T::Failure>,
{
  fn request(&self, demand: Demand) {
    let upstream = lock(&self.state).subscription();
    if let Some(upstream) = upstream {
      let demand = lock(&self.logic).upstream_demand(demand);
      upstream.request(demand);
    }
  }
}
