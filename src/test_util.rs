//! Probes shared by the unit tests.

use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

use crate::{
  completion::Completion,
  demand::Demand,
  publisher::Publisher,
  rc::MutArc,
  subscriber::{AnySubscriber, Subscriber},
  subscription::{Cancellable, SharedSubscription, Subscription},
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event<T, E> {
  Subscription,
  Value(T),
  Completion(Completion<E>),
}

/// Records every event. Requests `initial` on subscription and answers
/// every value with `per_value`.
pub(crate) struct Recorder<T, E> {
  events: MutArc<Vec<Event<T, E>>>,
  subscription: MutArc<Option<SharedSubscription>>,
  initial: Demand,
  per_value: Demand,
}

impl<T, E> Clone for Recorder<T, E> {
  fn clone(&self) -> Self {
    Recorder {
      events: self.events.clone(),
      subscription: self.subscription.clone(),
      initial: self.initial,
      per_value: self.per_value,
    }
  }
}

impl<T: Clone, E: Clone> Recorder<T, E> {
  pub fn unlimited() -> Self { Self::with_demand(Demand::UNLIMITED, Demand::NONE) }

  pub fn with_demand(initial: Demand, per_value: Demand) -> Self {
    Recorder {
      events: MutArc::own(vec![]),
      subscription: MutArc::own(None),
      initial,
      per_value,
    }
  }

  pub fn events(&self) -> Vec<Event<T, E>> { self.events.get() }

  pub fn values(&self) -> Vec<T> {
    self
      .events()
      .into_iter()
      .filter_map(|e| match e {
        Event::Value(v) => Some(v),
        _ => None,
      })
      .collect()
  }

  pub fn completions(&self) -> Vec<Completion<E>> {
    self
      .events()
      .into_iter()
      .filter_map(|e| match e {
        Event::Completion(c) => Some(c),
        _ => None,
      })
      .collect()
  }

  pub fn subscriptions(&self) -> usize {
    self.events().iter().filter(|e| matches!(e, Event::Subscription)).count()
  }

  pub fn request(&self, demand: Demand) {
    let sub = self.subscription.get();
    if let Some(sub) = sub {
      sub.request(demand);
    }
  }

  pub fn cancel(&self) {
    let sub = self.subscription.get();
    if let Some(sub) = sub {
      sub.cancel();
    }
  }
}

impl<T, E> Subscriber for Recorder<T, E>
where
  T: Send + 'static,
  E: Send + 'static,
{
  type Input = T;
  type Failure = E;

  fn receive_subscription(&self, subscription: SharedSubscription) {
    self.events.rc_deref_mut().push(Event::Subscription);
    *self.subscription.rc_deref_mut() = Some(subscription.clone());
    if self.initial > Demand::NONE {
      subscription.request(self.initial);
    }
  }

  fn receive(&self, input: T) -> Demand {
    self.events.rc_deref_mut().push(Event::Value(input));
    self.per_value
  }

  fn receive_completion(&self, completion: Completion<E>) {
    self.events.rc_deref_mut().push(Event::Completion(completion));
  }
}

/// A hand-driven upstream. It performs no protocol checks of its own, so
/// tests can use it to misbehave.
pub(crate) struct Manual<T: Send + 'static, E: Send + 'static> {
  subscribers: MutArc<Vec<AnySubscriber<T, E>>>,
  probe: Arc<Probe>,
}

#[derive(Default)]
pub(crate) struct Probe {
  requests: MutArc<Vec<Demand>>,
  cancels: AtomicUsize,
}

impl Cancellable for Probe {
  fn cancel(&self) { self.cancels.fetch_add(1, Ordering::SeqCst); }
}

impl Subscription for Probe {
  fn request(&self, demand: Demand) { self.requests.rc_deref_mut().push(demand) }
}

impl<T: Send + 'static, E: Send + 'static> Clone for Manual<T, E> {
  fn clone(&self) -> Self { Manual { subscribers: self.subscribers.clone(), probe: self.probe.clone() } }
}

impl<T: Send + 'static, E: Send + 'static> Manual<T, E> {
  pub fn new() -> Self { Manual { subscribers: MutArc::own(vec![]), probe: Arc::default() } }

  fn latest(&self) -> Option<AnySubscriber<T, E>> { self.subscribers.rc_deref_mut().last().cloned() }

  pub fn send(&self, value: T) -> Demand {
    self.latest().map_or(Demand::NONE, |s| s.receive(value))
  }

  pub fn complete(&self, completion: Completion<E>) {
    if let Some(s) = self.latest() {
      s.receive_completion(completion)
    }
  }

  /// Delivers an extra subscription to the latest subscriber.
  pub fn resubscribe(&self) {
    if let Some(s) = self.latest() {
      s.receive_subscription(self.probe.clone())
    }
  }

  pub fn subscriber_count(&self) -> usize { self.subscribers.rc_deref_mut().len() }

  pub fn requests(&self) -> Vec<Demand> { self.probe.requests.get() }

  pub fn total_requested(&self) -> Demand {
    self.requests().into_iter().fold(Demand::NONE, |acc, d| acc + d)
  }

  pub fn cancels(&self) -> usize { self.probe.cancels.load(Ordering::SeqCst) }
}

impl<T: Send + 'static, E: Send + 'static> Publisher for Manual<T, E> {
  type Output = T;
  type Failure = E;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = T, Failure = E>,
  {
    let subscriber = AnySubscriber::new(subscriber);
    self.subscribers.rc_deref_mut().push(subscriber.clone());
    subscriber.receive_subscription(self.probe.clone());
  }
}
