use std::{
  marker::PhantomData,
  sync::{Arc, Mutex, Weak},
};

use tracing::trace;

use crate::{
  channel::outbox::{self, Outbox},
  completion::Completion,
  demand::Demand,
  publisher::Publisher,
  rc::lock,
  subscriber::Subscriber,
  subscription::{Cancellable, SharedSubscription, Subscription, SubscriptionState},
};

/// Flattens a publisher of publishers by following only the most recent
/// inner publisher.
///
/// Each new inner publisher cancels the previous one before it is
/// subscribed, so nothing a superseded publisher sends gets through. The
/// stream finishes once the upstream and the current inner publisher have
/// both finished.
#[derive(Clone)]
pub struct SwitchToLatest<P> {
  upstream: P,
}

impl<P> SwitchToLatest<P> {
  pub(crate) fn new(upstream: P) -> Self { SwitchToLatest { upstream } }
}

struct Current {
  id: u64,
  subscription: Option<SharedSubscription>,
}

struct SwitchState<T, E> {
  outer: SubscriptionState,
  outer_finished: bool,
  current: Option<Current>,
  next_id: u64,
  demand: Demand,
  outbox: Outbox<T, E>,
}

impl<T, E> SwitchState<T, E> {
  fn is_current(&self, id: u64) -> bool { self.current.as_ref().is_some_and(|c| c.id == id) }

  fn shut_down(&mut self) -> Vec<SharedSubscription> {
    let mut cancel: Vec<_> = self.current.take().and_then(|c| c.subscription).into_iter().collect();
    cancel.extend(self.outer.cancel());
    cancel
  }
}

struct Switcher<Q, D: Subscriber> {
  me: Weak<Self>,
  state: Mutex<SwitchState<D::Input, D::Failure>>,
  downstream: D,
  _marker: PhantomData<fn(Q)>,
}

impl<Q, D> Switcher<Q, D>
where
  Q: Publisher<Output = D::Input, Failure = D::Failure> + Send + 'static,
  D: Subscriber,
{
  /// Lets `push` queue under the lock, then delivers whatever is queued
  /// unless another thread already is.
  fn deliver(&self, push: impl FnOnce(&mut SwitchState<D::Input, D::Failure>)) {
    let drain = {
      let mut state = lock(&self.state);
      push(&mut *state);
      state.outbox.begin_drain()
    };
    if drain {
      outbox::drain(&self.state, |s| &mut s.outbox, &self.downstream, |more| self.request(more));
    }
  }

  fn terminate(&self, completion: Completion<D::Failure>) {
    let mut cancel = vec![];
    self.deliver(|state| {
      if state.outbox.push_completion(completion) {
        cancel = state.shut_down();
      }
    });
    for subscription in cancel {
      subscription.cancel();
    }
  }

  fn inner_subscription(&self, id: u64, subscription: SharedSubscription) {
    let demand = {
      let mut state = lock(&self.state);
      let demand = state.demand;
      match &mut state.current {
        Some(current) if current.id == id && current.subscription.is_none() => {
          current.subscription = Some(subscription.clone());
          Some(demand)
        }
        _ => None,
      }
    };
    match demand {
      Some(demand) if demand > Demand::NONE => subscription.request(demand),
      Some(_) => {}
      None => subscription.cancel(),
    }
  }

  fn inner_value(&self, id: u64, value: D::Input) {
    self.deliver(|state| {
      if state.is_current(id) && !state.outbox.is_closed() {
        state.demand -= 1;
        state.outbox.push_value(value);
      } else {
        trace!(id, "switch_to_latest: value from a superseded publisher dropped");
      }
    });
  }

  fn inner_completion(&self, id: u64, completion: Completion<D::Failure>) {
    let finish = {
      let mut state = lock(&self.state);
      if !state.is_current(id) {
        return;
      }
      state.current = None;
      completion.is_failure() || state.outer_finished
    };
    if finish {
      self.terminate(completion);
    }
  }
}

impl<Q, D> Subscriber for Switcher<Q, D>
where
  Q: Publisher<Output = D::Input, Failure = D::Failure> + Send + 'static,
  D: Subscriber,
{
  type Input = Q;
  type Failure = D::Failure;

  fn receive_subscription(&self, subscription: SharedSubscription) {
    if !lock(&self.state).outer.receive_subscription(subscription.clone()) {
      subscription.cancel();
      return;
    }
    if let Some(me) = self.me.upgrade() {
      self.downstream.receive_subscription(me);
    }
    subscription.request(Demand::UNLIMITED);
  }

  fn receive(&self, publisher: Q) -> Demand {
    let (id, previous) = {
      let mut state = lock(&self.state);
      if !state.outer.is_subscribed_and_not_completed() || state.outbox.is_closed() {
        return Demand::NONE;
      }
      let id = state.next_id;
      state.next_id += 1;
      let previous = state.current.replace(Current { id, subscription: None });
      (id, previous.and_then(|c| c.subscription))
    };
    if let Some(previous) = previous {
      previous.cancel();
    }
    publisher.subscribe(Inner { id, switcher: self.me.clone() });
    Demand::NONE
  }

  fn receive_completion(&self, completion: Completion<D::Failure>) {
    let finish = {
      let mut state = lock(&self.state);
      if !state.outer.receive_completion(completion.is_finished()) {
        return;
      }
      state.outer_finished = true;
      completion.is_failure() || state.current.is_none()
    };
    if finish {
      self.terminate(completion);
    }
  }
}

impl<Q, D: Subscriber> Cancellable for Switcher<Q, D> {
  fn cancel(&self) {
    let cancel = {
      let mut state = lock(&self.state);
      state.outbox.close();
      state.shut_down()
    };
    for subscription in cancel {
      subscription.cancel();
    }
  }
}

impl<Q, D> Subscription for Switcher<Q, D>
where
  Q: Publisher<Output = D::Input, Failure = D::Failure> + Send + 'static,
  D: Subscriber,
{
  fn request(&self, demand: Demand) {
    let inner = {
      let mut state = lock(&self.state);
      if state.outbox.is_closed() {
        return;
      }
      state.demand += demand;
      state.current.as_ref().and_then(|c| c.subscription.clone())
    };
    if let Some(inner) = inner {
      inner.request(demand);
    }
  }
}

struct Inner<Q, D: Subscriber> {
  id: u64,
  switcher: Weak<Switcher<Q, D>>,
}

impl<Q, D> Subscriber for Inner<Q, D>
where
  Q: Publisher<Output = D::Input, Failure = D::Failure> + Send + 'static,
  D: Subscriber,
{
  type Input = D::Input;
  type Failure = D::Failure;

  fn receive_subscription(&self, subscription: SharedSubscription) {
    match self.switcher.upgrade() {
      Some(switcher) => switcher.inner_subscription(self.id, subscription),
      None => subscription.cancel(),
    }
  }

  fn receive(&self, input: D::Input) -> Demand {
    if let Some(switcher) = self.switcher.upgrade() {
      switcher.inner_value(self.id, input);
    }
    Demand::NONE
  }

  fn receive_completion(&self, completion: Completion<D::Failure>) {
    if let Some(switcher) = self.switcher.upgrade() {
      switcher.inner_completion(self.id, completion);
    }
  }
}

impl<P, Q> Publisher for SwitchToLatest<P>
where
  P: Publisher<Output = Q>,
  Q: Publisher<Failure = P::Failure> + Send + 'static,
{
  type Output = Q::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = Q::Output, Failure = P::Failure>,
  {
    let switcher = Arc::new_cyclic(|me| Switcher::<Q, S> {
      me: me.clone(),
      state: Mutex::new(SwitchState {
        outer: SubscriptionState::Pending,
        outer_finished: false,
        current: None,
        next_id: 0,
        demand: Demand::NONE,
        outbox: Outbox::default(),
      }),
      downstream: subscriber,
      _marker: PhantomData,
    });
    self.upstream.subscribe(switcher);
  }
}
