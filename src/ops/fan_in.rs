//! The shared engine behind `merge`, `combine_latest` and `zip`.
//!
//! One [`Aggregate`] owns all per-slot state behind a single lock. Each
//! upstream is attached through a [`Slot`] that only holds a weak
//! reference; the aggregate itself is kept alive by the downstream, which
//! holds it as its subscription.

use std::{
  any::Any,
  marker::PhantomData,
  sync::{Arc, Mutex, Weak},
};

use tracing::trace;

use crate::{
  channel::outbox::{self, Outbox},
  completion::Completion,
  demand::Demand,
  rc::lock,
  subscriber::Subscriber,
  subscription::{Cancellable, SharedSubscription, Subscription, SubscriptionState},
};

pub(crate) type Boxed = Box<dyn Any + Send>;

/// How an aggregate turns slot values into outputs.
pub(crate) trait Gather: Send + 'static {
  type Output: Send + 'static;

  /// Stores a value that arrived on slot `index`.
  fn put(&mut self, index: usize, value: Boxed);

  /// The next output ready for delivery.
  fn take(&mut self) -> Option<Self::Output>;

  fn has_ready(&self) -> bool;

  /// Whether nothing more can ever be produced, given which slots have
  /// finished.
  fn is_exhausted(&self, finished: &[bool]) -> bool;

  /// Drops everything buffered.
  fn clear(&mut self);
}

struct AggregateState<G: Gather, E> {
  gather: G,
  upstreams: Vec<SubscriptionState>,
  finished: Vec<bool>,
  /// Outstanding downstream demand.
  demand: Demand,
  /// Everything the downstream ever requested, replayed to late upstreams.
  requested: Demand,
  downstream_subscribed: bool,
  outbox: Outbox<G::Output, E>,
}

pub(crate) struct Aggregate<G: Gather, D: Subscriber> {
  me: Weak<Self>,
  state: Mutex<AggregateState<G, D::Failure>>,
  downstream: D,
}

impl<G, D> Aggregate<G, D>
where
  G: Gather,
  D: Subscriber<Input = G::Output>,
{
  pub fn new(gather: G, slots: usize, downstream: D) -> Arc<Self> {
    Arc::new_cyclic(|me| Aggregate {
      me: me.clone(),
      state: Mutex::new(AggregateState {
        gather,
        upstreams: (0..slots).map(|_| SubscriptionState::Pending).collect(),
        finished: vec![false; slots],
        demand: Demand::NONE,
        requested: Demand::NONE,
        downstream_subscribed: false,
        outbox: Outbox::default(),
      }),
      downstream,
    })
  }

  /// Makes sure the downstream has its subscription once every upstream
  /// has been attached, even if none of them answered synchronously.
  pub fn attached(&self) { self.subscribe_downstream(); }

  fn subscribe_downstream(&self) {
    {
      let mut state = lock(&self.state);
      if state.downstream_subscribed {
        return;
      }
      state.downstream_subscribed = true;
    }
    if let Some(me) = self.me.upgrade() {
      self.downstream.receive_subscription(me);
    }
  }

  fn receive_subscription(&self, index: usize, subscription: SharedSubscription) {
    let (accepted, first, replay) = {
      let mut state = lock(&self.state);
      let accepted = state.upstreams[index].receive_subscription(subscription.clone());
      (accepted, !state.downstream_subscribed, state.requested)
    };
    if !accepted {
      subscription.cancel();
      return;
    }
    if first {
      self.subscribe_downstream();
    } else if replay > Demand::NONE {
      subscription.request(replay);
    }
  }

  fn receive(&self, index: usize, value: Boxed) {
    {
      let mut state = lock(&self.state);
      if !state.upstreams[index].is_subscribed_and_not_completed() || state.outbox.is_closed() {
        trace!(index, "value dropped: slot is not live");
        return;
      }
      state.gather.put(index, value);
    }
    self.pump();
  }

  fn receive_completion(&self, index: usize, completion: Completion<D::Failure>) {
    let cancel = {
      let mut state = lock(&self.state);
      if !state.upstreams[index].receive_completion(completion.is_finished()) || state.outbox.is_closed() {
        return;
      }
      match completion {
        Completion::Finished => {
          state.finished[index] = true;
          vec![]
        }
        failure => {
          state.gather.clear();
          state.outbox.push_completion(failure);
          state.upstreams.iter_mut().filter_map(SubscriptionState::cancel).collect()
        }
      }
    };
    cancel_all(cancel);
    self.pump();
  }

  /// Moves ready outputs into the outbox as far as demand allows, decides
  /// on completion, then delivers.
  fn pump(&self) {
    loop {
      let (drain, cancel) = {
        let mut state = lock(&self.state);
        let state = &mut *state;
        while state.demand > Demand::NONE && !state.outbox.is_closed() {
          match state.gather.take() {
            Some(output) => {
              state.demand -= 1;
              state.outbox.push_value(output);
            }
            None => break,
          }
        }
        let mut cancel = vec![];
        if !state.outbox.is_closed() && state.gather.is_exhausted(&state.finished) && !state.gather.has_ready() {
          state.outbox.push_completion(Completion::Finished);
          cancel = state.upstreams.iter_mut().filter_map(SubscriptionState::cancel).collect();
        }
        (state.outbox.begin_drain(), cancel)
      };
      cancel_all(cancel);
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
      self.forward(more);
    }
  }

  fn forward(&self, demand: Demand) {
    let upstreams: Vec<_> = {
      let mut state = lock(&self.state);
      state.requested += demand;
      state.upstreams.iter().filter_map(SubscriptionState::subscription).collect()
    };
    for upstream in upstreams {
      upstream.request(demand);
    }
  }
}

fn cancel_all(subscriptions: Vec<SharedSubscription>) {
  for subscription in subscriptions {
    subscription.cancel();
  }
}

impl<G: Gather, D: Subscriber> Cancellable for Aggregate<G, D> {
  fn cancel(&self) {
    let cancel: Vec<_> = {
      let mut state = lock(&self.state);
      state.outbox.close();
      state.gather.clear();
      state.upstreams.iter_mut().filter_map(SubscriptionState::cancel).collect()
    };
    cancel_all(cancel);
  }
}

impl<G, D> Subscription for Aggregate<G, D>
where
  G: Gather,
  D: Subscriber<Input = G::Output>,
{
  fn request(&self, demand: Demand) {
    {
      let mut state = lock(&self.state);
      if state.outbox.is_closed() {
        trace!("request ignored: aggregate is closed");
        return;
      }
      state.demand += demand;
    }
    self.forward(demand);
    self.pump();
  }
}

// ==================== Slot ====================

/// The subscriber attached to upstream number `index`.
pub(crate) struct Slot<A, G: Gather, D: Subscriber> {
  index: usize,
  aggregate: Weak<Aggregate<G, D>>,
  _marker: PhantomData<fn(A)>,
}

impl<A, G: Gather, D: Subscriber> Slot<A, G, D> {
  pub fn new(index: usize, aggregate: &Arc<Aggregate<G, D>>) -> Self {
    Slot { index, aggregate: Arc::downgrade(aggregate), _marker: PhantomData }
  }
}

impl<A, G, D> Subscriber for Slot<A, G, D>
where
  A: Send + 'static,
  G: Gather,
  D: Subscriber<Input = G::Output>,
{
  type Input = A;
  type Failure = D::Failure;

  fn receive_subscription(&self, subscription: SharedSubscription) {
    match self.aggregate.upgrade() {
      Some(aggregate) => aggregate.receive_subscription(self.index, subscription),
      None => subscription.cancel(),
    }
  }

  fn receive(&self, input: A) -> Demand {
    if let Some(aggregate) = self.aggregate.upgrade() {
      aggregate.receive(self.index, Box::new(input));
    }
    Demand::NONE
  }

  fn receive_completion(&self, completion: Completion<D::Failure>) {
    if let Some(aggregate) = self.aggregate.upgrade() {
      aggregate.receive_completion(self.index, completion);
    }
  }
}

/// Recovers a value a [`Slot`] boxed.
pub(crate) fn unbox<T: 'static>(value: Boxed) -> T {
  match value.downcast::<T>() {
    Ok(value) => *value,
    Err(_) => unreachable!("slot value of an unexpected type"),
  }
}
