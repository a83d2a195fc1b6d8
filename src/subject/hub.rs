//! The shared fan-out machinery behind every subject.

use std::sync::{Arc, Mutex, Weak};

use tracing::trace;

use crate::{
  channel::outbox::{self, Outbox},
  completion::Completion,
  demand::Demand,
  rc::lock,
  subscriber::{AnySubscriber, Subscriber},
  subscription::{self, Cancellable, Registry, SharedSubscription, Subscription},
};

struct HubState<T: Send + 'static, E: Send + 'static> {
  conduits: Registry<Arc<Conduit<T, E>>>,
  completion: Option<Completion<E>>,
  upstreams: Vec<SharedSubscription>,
  current: Option<T>,
}

/// Subscriber slots plus the latched completion of one subject.
///
/// With `keep_latest` a subscriber without demand holds on to the most
/// recent value and receives it on its next request; otherwise values sent
/// while it has no demand are dropped for it.
pub(crate) struct Hub<T: Send + 'static, E: Send + 'static> {
  state: Arc<Mutex<HubState<T, E>>>,
  keep_latest: bool,
}

impl<T: Send + 'static, E: Send + 'static> Clone for Hub<T, E> {
  fn clone(&self) -> Self { Hub { state: self.state.clone(), keep_latest: self.keep_latest } }
}

impl<T, E> Hub<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  pub fn new(current: Option<T>) -> Self {
    Hub {
      keep_latest: current.is_some(),
      state: Arc::new(Mutex::new(HubState {
        conduits: Registry::default(),
        completion: None,
        upstreams: vec![],
        current,
      })),
    }
  }

  pub fn current(&self) -> Option<T> { lock(&self.state).current.clone() }

  pub fn subscriber_count(&self) -> usize { lock(&self.state).conduits.len() }

  /// Registers the subscriber before handing it its subscription, so a
  /// cancel or a send from inside `receive_subscription` sees the slot.
  pub fn subscribe(&self, downstream: AnySubscriber<T, E>) {
    let registered = {
      let mut state = lock(&self.state);
      match state.completion.clone() {
        Some(completion) => Err(completion),
        None => {
          let conduit = Arc::new(Conduit {
            hub: Arc::downgrade(&self.state),
            id: Mutex::new(None),
            state: Mutex::new(ConduitState {
              downstream: Some(downstream.clone()),
              attached: false,
              demand: Demand::NONE,
              pending: if self.keep_latest { state.current.clone() } else { None },
              keep_latest: self.keep_latest,
              outbox: Outbox::default(),
            }),
          });
          let id = state.conduits.add(conduit.clone());
          *lock(&conduit.id) = Some(id);
          Ok(conduit)
        }
      }
    };
    match registered {
      Ok(conduit) => {
        downstream.receive_subscription(conduit.clone());
        conduit.attach();
      }
      Err(completion) => {
        downstream.receive_subscription(subscription::empty());
        downstream.receive_completion(completion);
      }
    }
  }

  pub fn send(&self, value: T) {
    let conduits = {
      let mut state = lock(&self.state);
      if state.completion.is_some() {
        trace!("value dropped: subject already completed");
        return;
      }
      if state.current.is_some() {
        state.current = Some(value.clone());
      }
      state.conduits.snapshot()
    };
    let mut iter = conduits.iter().peekable();
    while let Some(conduit) = iter.next() {
      if iter.peek().is_some() {
        conduit.offer(value.clone());
      } else {
        conduit.offer(value);
        break;
      }
    }
  }

  pub fn send_completion(&self, completion: Completion<E>) {
    let (conduits, upstreams) = {
      let mut state = lock(&self.state);
      if state.completion.is_some() {
        trace!("completion dropped: subject already completed");
        return;
      }
      state.completion = Some(completion.clone());
      let conduits: Vec<_> = state.conduits.drain().collect();
      (conduits, std::mem::take(&mut state.upstreams))
    };
    drop(upstreams);
    for conduit in conduits {
      conduit.finish(completion.clone());
    }
  }

  /// Feeds the subject from an upstream publisher.
  pub fn send_subscription(&self, subscription: SharedSubscription) {
    let accepted = {
      let mut state = lock(&self.state);
      let accepted = state.completion.is_none();
      if accepted {
        state.upstreams.push(subscription.clone());
      }
      accepted
    };
    if accepted {
      subscription.request(Demand::UNLIMITED);
    } else {
      subscription.cancel();
    }
  }
}

// ==================== Conduit ====================

struct ConduitState<T: Send + 'static, E: Send + 'static> {
  downstream: Option<AnySubscriber<T, E>>,
  /// Set once the downstream holds its subscription; nothing is delivered
  /// before that.
  attached: bool,
  demand: Demand,
  pending: Option<T>,
  keep_latest: bool,
  outbox: Outbox<T, E>,
}

/// One subscriber's slot: its demand and its delivery queue.
struct Conduit<T: Send + 'static, E: Send + 'static> {
  hub: Weak<Mutex<HubState<T, E>>>,
  id: Mutex<Option<usize>>,
  state: Mutex<ConduitState<T, E>>,
}

impl<T, E> Conduit<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  fn offer(&self, value: T) {
    {
      let mut state = lock(&self.state);
      if state.downstream.is_none() {
        return;
      }
      if state.demand == Demand::NONE {
        if state.keep_latest {
          state.pending = Some(value);
        }
        return;
      }
      state.demand -= 1;
      state.pending = None;
      state.outbox.push_value(value);
    }
    self.drain();
  }

  fn finish(&self, completion: Completion<E>) {
    {
      let mut state = lock(&self.state);
      state.pending = None;
      state.outbox.push_completion(completion);
    }
    self.release();
  }

  /// Starts delivery once `receive_subscription` has returned.
  fn attach(&self) {
    lock(&self.state).attached = true;
    self.release();
  }

  /// Drains, then lets go of the downstream if the completion is out.
  fn release(&self) {
    self.drain();
    let mut state = lock(&self.state);
    if state.attached && state.outbox.is_closed() {
      state.downstream = None;
    }
  }

  fn drain(&self) {
    let downstream = {
      let mut state = lock(&self.state);
      if !state.attached || !state.outbox.begin_drain() {
        return;
      }
      state.downstream.clone()
    };
    if let Some(downstream) = downstream {
      outbox::drain(&self.state, |s| &mut s.outbox, &downstream, |more| lock(&self.state).demand += more);
    }
  }
}

impl<T: Send + 'static, E: Send + 'static> Cancellable for Conduit<T, E> {
  fn cancel(&self) {
    {
      let mut state = lock(&self.state);
      if state.downstream.take().is_none() {
        return;
      }
      state.pending = None;
      state.outbox.close();
    }
    let id = lock(&self.id).take();
    if let (Some(id), Some(hub)) = (id, self.hub.upgrade()) {
      lock(&hub).conduits.remove(id);
    }
  }
}

impl<T, E> Subscription for Conduit<T, E>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
{
  fn request(&self, demand: Demand) {
    {
      let mut state = lock(&self.state);
      if state.downstream.is_none() {
        trace!("request ignored: subject subscription is over");
        return;
      }
      state.demand += demand;
      if state.demand > Demand::NONE {
        if let Some(value) = state.pending.take() {
          state.demand -= 1;
          state.outbox.push_value(value);
        }
      }
    }
    self.drain();
  }
}
