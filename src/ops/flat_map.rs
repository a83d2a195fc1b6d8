//! `flat_map`: every upstream value becomes an inner publisher whose values
//! are merged into one stream.
//!
//! Two budgets are kept apart. `max_publishers` bounds how many inner
//! publishers are in flight: the upstream is asked for that many values up
//! front and for one more each time an inner publisher finishes. The
//! downstream's demand is spent strictly per inner subscription: an inner
//! publisher is asked for one value at a time (or for everything while the
//! downstream demand is unlimited), and a value that arrives without
//! downstream demand waits in a queue until there is some.

use std::{
  collections::VecDeque,
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
  subscription::{Cancellable, Registry, SharedSubscription, Subscription, SubscriptionState},
};

pub struct FlatMap<P, F> {
  upstream: P,
  max_publishers: Demand,
  transform: Arc<F>,
}

impl<P, F> FlatMap<P, F> {
  pub(crate) fn new(upstream: P, max_publishers: Demand, transform: F) -> Self {
    FlatMap { upstream, max_publishers, transform: Arc::new(transform) }
  }
}

impl<P: Clone, F> Clone for FlatMap<P, F> {
  fn clone(&self) -> Self {
    FlatMap {
      upstream: self.upstream.clone(),
      max_publishers: self.max_publishers,
      transform: self.transform.clone(),
    }
  }
}

struct Inner {
  subscription: Option<SharedSubscription>,
  /// Asked for everything rather than one value at a time.
  unlimited: bool,
}

struct MergerState<T, E> {
  outer: SubscriptionState,
  outer_finished: bool,
  inners: Registry<Inner>,
  /// Inner values waiting for downstream demand, tagged with their inner.
  queue: VecDeque<(usize, T)>,
  demand: Demand,
  outbox: Outbox<T, E>,
}

impl<T, E> MergerState<T, E> {
  /// Cancels everything and hands back what must be cancelled once the lock
  /// is released.
  fn shut_down(&mut self) -> Vec<SharedSubscription> {
    self.queue.clear();
    let mut cancel: Vec<_> = self.inners.drain().filter_map(|inner| inner.subscription).collect();
    cancel.extend(self.outer.cancel());
    cancel
  }
}

struct Merger<I, Q, F, D: Subscriber> {
  me: Weak<Self>,
  state: Mutex<MergerState<D::Input, D::Failure>>,
  max_publishers: Demand,
  transform: Arc<F>,
  downstream: D,
  _marker: PhantomData<fn(I) -> Q>,
}

fn cancel_all(subscriptions: Vec<SharedSubscription>) {
  for subscription in subscriptions {
    subscription.cancel();
  }
}

impl<I, Q, F, D> Merger<I, Q, F, D>
where
  I: Send + 'static,
  Q: Publisher<Output = D::Input, Failure = D::Failure> + 'static,
  F: Fn(I) -> Q + Send + Sync + 'static,
  D: Subscriber,
{
  fn fail(&self, completion: Completion<D::Failure>) {
    let cancel = {
      let mut state = lock(&self.state);
      if state.outbox.is_closed() {
        return;
      }
      state.outbox.push_completion(completion);
      state.shut_down()
    };
    cancel_all(cancel);
    self.pump();
  }

  fn pump(&self) {
    loop {
      let (drain, refill) = {
        let mut state = lock(&self.state);
        let state = &mut *state;
        let mut refill = vec![];
        while state.demand > Demand::NONE && !state.outbox.is_closed() {
          let Some((id, value)) = state.queue.pop_front() else { break };
          state.demand -= 1;
          state.outbox.push_value(value);
          if let Some(Inner { subscription: Some(subscription), unlimited: false }) = state.inners.get(id) {
            refill.push(subscription.clone());
          }
        }
        if !state.outbox.is_closed() && state.outer_finished && state.inners.is_empty() && state.queue.is_empty() {
          state.outbox.push_completion(Completion::Finished);
        }
        (state.outbox.begin_drain(), refill)
      };
      for subscription in refill {
        subscription.request(Demand::max(1));
      }
      if !drain {
        return;
      }
      let mut more = Demand::NONE;
      outbox::drain(&self.state, |s| &mut s.outbox, &self.downstream, |d| {
        lock(&self.state).demand += d;
        more += d;
      });
      if more == Demand::NONE {
        return;
      }
    }
  }

  fn inner_subscription(&self, id: usize, subscription: SharedSubscription) {
    let demand = {
      let mut state = lock(&self.state);
      let unlimited = state.demand.is_unlimited();
      let closed = state.outbox.is_closed();
      match state.inners.get_mut(id) {
        Some(inner) if inner.subscription.is_none() && !closed => {
          inner.subscription = Some(subscription.clone());
          inner.unlimited = unlimited;
          Some(if unlimited { Demand::UNLIMITED } else { Demand::max(1) })
        }
        _ => None,
      }
    };
    match demand {
      Some(demand) => subscription.request(demand),
      None => subscription.cancel(),
    }
  }

  fn inner_value(&self, id: usize, value: D::Input) {
    {
      let mut state = lock(&self.state);
      if state.outbox.is_closed() || !state.inners.contains(id) {
        trace!(id, "flat_map: value from a retired inner publisher dropped");
        return;
      }
      state.queue.push_back((id, value));
    }
    self.pump();
  }

  fn inner_completion(&self, id: usize, completion: Completion<D::Failure>) {
    if completion.is_failure() {
      self.fail(completion);
      return;
    }
    let refund = {
      let mut state = lock(&self.state);
      if state.inners.remove(id).is_none() {
        return;
      }
      if self.max_publishers.is_unlimited() { None } else { state.outer.subscription() }
    };
    if let Some(outer) = refund {
      outer.request(Demand::max(1));
    }
    self.pump();
  }
}

impl<I, Q, F, D> Subscriber for Merger<I, Q, F, D>
where
  I: Send + 'static,
  Q: Publisher<Output = D::Input, Failure = D::Failure> + 'static,
  F: Fn(I) -> Q + Send + Sync + 'static,
  D: Subscriber,
{
  type Input = I;
  type Failure = D::Failure;

  fn receive_subscription(&self, subscription: SharedSubscription) {
    let accepted = lock(&self.state).outer.receive_subscription(subscription.clone());
    if !accepted {
      subscription.cancel();
      return;
    }
    if let Some(me) = self.me.upgrade() {
      self.downstream.receive_subscription(me);
    }
    if self.max_publishers > Demand::NONE {
      subscription.request(self.max_publishers);
    }
  }

  fn receive(&self, input: I) -> Demand {
    let id = {
      let mut state = lock(&self.state);
      if !state.outer.is_subscribed_and_not_completed() || state.outbox.is_closed() {
        return Demand::NONE;
      }
      let id = state.inners.reserve_id();
      state.inners.insert(id, Inner { subscription: None, unlimited: false });
      id
    };
    let publisher = (self.transform)(input);
    publisher.subscribe(InnerSubscriber { id, merger: self.me.clone() });
    Demand::NONE
  }

  fn receive_completion(&self, completion: Completion<D::Failure>) {
    if !lock(&self.state).outer.receive_completion(completion.is_finished()) {
      return;
    }
    match completion {
      Completion::Finished => {
        lock(&self.state).outer_finished = true;
        self.pump();
      }
      failure => self.fail(failure),
    }
  }
}

impl<I, Q, F, D: Subscriber> Cancellable for Merger<I, Q, F, D> {
  fn cancel(&self) {
    let cancel = {
      let mut state = lock(&self.state);
      state.outbox.close();
      state.shut_down()
    };
    cancel_all(cancel);
  }
}

impl<I, Q, F, D> Subscription for Merger<I, Q, F, D>
where
  I: Send + 'static,
  Q: Publisher<Output = D::Input, Failure = D::Failure> + 'static,
  F: Fn(I) -> Q + Send + Sync + 'static,
  D: Subscriber,
{
  fn request(&self, demand: Demand) {
    {
      let mut state = lock(&self.state);
      if state.outbox.is_closed() {
        return;
      }
      state.demand += demand;
    }
    self.pump();
  }
}

struct InnerSubscriber<I, Q, F, D: Subscriber> {
  id: usize,
  merger: Weak<Merger<I, Q, F, D>>,
}

impl<I, Q, F, D> Subscriber for InnerSubscriber<I, Q, F, D>
where
  I: Send + 'static,
  Q: Publisher<Output = D::Input, Failure = D::Failure> + 'static,
  F: Fn(I) -> Q + Send + Sync + 'static,
  D: Subscriber,
{
  type Input = D::Input;
  type Failure = D::Failure;

  fn receive_subscription(&self, subscription: SharedSubscription) {
    match self.merger.upgrade() {
      Some(merger) => merger.inner_subscription(self.id, subscription),
      None => subscription.cancel(),
    }
  }

  fn receive(&self, input: D::Input) -> Demand {
    if let Some(merger) = self.merger.upgrade() {
      merger.inner_value(self.id, input);
    }
    Demand::NONE
  }

  fn receive_completion(&self, completion: Completion<D::Failure>) {
    if let Some(merger) = self.merger.upgrade() {
      merger.inner_completion(self.id, completion);
    }
  }
}

impl<P, F, Q> Publisher for FlatMap<P, F>
where
  P: Publisher,
  F: Fn(P::Output) -> Q + Send + Sync + 'static,
  Q: Publisher<Failure = P::Failure> + 'static,
{
  type Output = Q::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = Q::Output, Failure = P::Failure>,
  {
    let merger = Arc::new_cyclic(|me| Merger::<P::Output, Q, F, S> {
      me: me.clone(),
      state: Mutex::new(MergerState {
        outer: SubscriptionState::Pending,
        outer_finished: false,
        inners: Registry::new(),
        queue: VecDeque::new(),
        demand: Demand::NONE,
        outbox: Outbox::default(),
      }),
      max_publishers: self.max_publishers,
      transform: self.transform.clone(),
      downstream: subscriber,
      _marker: PhantomData,
    });
    self.upstream.subscribe(merger);
  }
}

#[cfg(test)]
mod tests {
  use crate::{
    prelude::*,
    test_util::{Manual, Recorder},
  };

  #[test]
  fn flattens_in_arrival_order() {
    let rec = Recorder::unlimited();
    publisher::from_iter(vec![1, 2, 3])
      .flat_map(Demand::UNLIMITED, |n| publisher::from_iter(vec![n * 10, n * 10 + 1]))
      .subscribe(rec.clone());
    assert_eq!(rec.values(), vec![10, 11, 20, 21, 30, 31]);
    assert_eq!(rec.completions(), vec![Completion::Finished]);
  }

  #[test]
  fn max_publishers_bounds_inner_subscriptions() {
    let first = Manual::<i32, Never>::new();
    let second = Manual::<i32, Never>::new();
    let inners = [first.clone(), second.clone()];
    let outer = PassthroughSubject::<usize, Never>::new();
    let rec = Recorder::unlimited();
    outer
      .clone()
      .flat_map(Demand::max(1), move |i| inners[i].clone())
      .subscribe(rec.clone());

    outer.send(0);
    outer.send(1);
    assert_eq!(first.subscriber_count(), 1);
    assert_eq!(second.subscriber_count(), 0);

    first.send(5);
    first.complete(Completion::Finished);
    outer.send(1);
    assert_eq!(second.subscriber_count(), 1);
    second.send(6);
    assert_eq!(rec.values(), vec![5, 6]);
  }

  #[test]
  fn waits_for_inners_before_finishing() {
    let inner = PassthroughSubject::<i32, Never>::new();
    let c_inner = inner.clone();
    let rec = Recorder::unlimited();
    publisher::just(())
      .flat_map(Demand::UNLIMITED, move |_| c_inner.clone())
      .subscribe(rec.clone());
    assert!(rec.completions().is_empty());
    inner.send(1);
    inner.send_completion(Completion::Finished);
    assert_eq!(rec.values(), vec![1]);
    assert_eq!(rec.completions(), vec![Completion::Finished]);
  }

  #[test]
  fn inner_failure_cancels_everything() {
    let a = Manual::<i32, &str>::new();
    let b = Manual::<i32, &str>::new();
    let inners = [a.clone(), b.clone()];
    let outer = Manual::<usize, &str>::new();
    let rec = Recorder::unlimited();
    outer
      .clone()
      .flat_map(Demand::UNLIMITED, move |i| inners[i].clone())
      .subscribe(rec.clone());
    outer.send(0);
    outer.send(1);
    b.complete(Completion::Failure("inner"));
    a.send(1);
    assert!(rec.values().is_empty());
    assert_eq!(rec.completions(), vec![Completion::Failure("inner")]);
    assert_eq!(a.cancels(), 1);
    assert_eq!(outer.cancels(), 1);
  }

  #[test]
  fn inner_demand_is_one_at_a_time() {
    let inner = Manual::<i32, Never>::new();
    let c_inner = inner.clone();
    let rec = Recorder::with_demand(Demand::max(2), Demand::NONE);
    publisher::just(())
      .flat_map(Demand::UNLIMITED, move |_| c_inner.clone())
      .subscribe(rec.clone());
    assert_eq!(inner.requests(), vec![Demand::max(1)]);
    inner.send(1);
    assert_eq!(inner.requests(), vec![Demand::max(1), Demand::max(1)]);
    inner.send(2);
    inner.send(3);
    assert_eq!(rec.values(), vec![1, 2]);
    rec.request(Demand::max(1));
    assert_eq!(rec.values(), vec![1, 2, 3]);
  }
}
