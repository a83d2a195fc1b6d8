use std::sync::{Arc, Mutex, Weak};

use tracing::trace;

use crate::{
  completion::Completion,
  demand::Demand,
  publisher::Publisher,
  rc::lock,
  subscriber::Subscriber,
  subscription::{Cancellable, Subscription},
};

trait Waiter<T, E>: Send + Sync {
  fn settle(&self);
}

struct Shared<T, E> {
  result: Option<Result<T, E>>,
  waiters: Vec<Weak<dyn Waiter<T, E>>>,
}

/// A publisher that eventually produces one value or fails.
///
/// The closure passed to [`FuturePublisher::new`] runs right away and gets
/// a [`Promise`]. Every subscriber, early or late, receives the same
/// result. A value waits for demand; a failure does not.
///
/// ```rust
/// use traffic::prelude::*;
///
/// let (tx, rx) = std::sync::mpsc::channel();
/// let future = publisher::future(move |promise: Promise<i32, Never>| {
///   tx.send(promise).unwrap();
/// });
/// let seen = MutArc::own(vec![]);
/// let c_seen = seen.clone();
/// let _c = future.sink_value(move |v| c_seen.rc_deref_mut().push(v));
/// rx.recv().unwrap().fulfill(Ok(7));
/// assert_eq!(seen.get(), vec![7]);
/// ```
pub struct FuturePublisher<T, E> {
  shared: Arc<Mutex<Shared<T, E>>>,
}

impl<T, E> Clone for FuturePublisher<T, E> {
  fn clone(&self) -> Self { FuturePublisher { shared: self.shared.clone() } }
}

/// Fulfills a [`FuturePublisher`]. Only the first result counts.
pub struct Promise<T, E> {
  shared: Arc<Mutex<Shared<T, E>>>,
}

impl<T, E> Clone for Promise<T, E> {
  fn clone(&self) -> Self { Promise { shared: self.shared.clone() } }
}

impl<T, E> Promise<T, E> {
  pub fn fulfill(&self, result: Result<T, E>) {
    let waiters = {
      let mut shared = lock(&self.shared);
      if shared.result.is_some() {
        trace!("promise already fulfilled, result dropped");
        return;
      }
      shared.result = Some(result);
      std::mem::take(&mut shared.waiters)
    };
    for waiter in waiters.iter().filter_map(Weak::upgrade) {
      waiter.settle();
    }
  }
}

impl<T, E> FuturePublisher<T, E> {
  pub fn new(attempt: impl FnOnce(Promise<T, E>)) -> Self {
    let shared = Arc::new(Mutex::new(Shared { result: None, waiters: vec![] }));
    attempt(Promise { shared: shared.clone() });
    FuturePublisher { shared }
  }
}

struct Delivery<S> {
  downstream: Option<Arc<S>>,
  subscribed: bool,
  requested: bool,
}

struct FutureSubscription<T, E, S> {
  shared: Arc<Mutex<Shared<T, E>>>,
  delivery: Mutex<Delivery<S>>,
}

impl<T, E, S> Waiter<T, E> for FutureSubscription<T, E, S>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
  S: Subscriber<Input = T, Failure = E>,
{
  fn settle(&self) {
    let Some(result) = lock(&self.shared).result.clone() else {
      return;
    };
    let downstream = {
      let mut delivery = lock(&self.delivery);
      if !delivery.subscribed || (result.is_ok() && !delivery.requested) {
        return;
      }
      delivery.downstream.take()
    };
    let Some(downstream) = downstream else { return };
    match result {
      Ok(value) => {
        downstream.receive(value);
        downstream.receive_completion(Completion::Finished);
      }
      Err(e) => downstream.receive_completion(Completion::Failure(e)),
    }
  }
}

impl<T, E, S: Send + Sync> Cancellable for FutureSubscription<T, E, S> {
  fn cancel(&self) { lock(&self.delivery).downstream = None; }
}

impl<T, E, S> Subscription for FutureSubscription<T, E, S>
where
  T: Clone + Send + 'static,
  E: Clone + Send + 'static,
  S: Subscriber<Input = T, Failure = E>,
{
  fn request(&self, demand: Demand) {
    if demand == Demand::NONE {
      return;
    }
    lock(&self.delivery).requested = true;
    self.settle();
  }
}

impl<T, E> Publisher for FuturePublisher<T, E>
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
    let downstream = Arc::new(subscriber);
    let subscription = Arc::new(FutureSubscription {
      shared: self.shared.clone(),
      delivery: Mutex::new(Delivery { downstream: Some(downstream.clone()), subscribed: false, requested: false }),
    });
    downstream.receive_subscription(subscription.clone());
    lock(&subscription.delivery).subscribed = true;
    {
      let mut shared = lock(&self.shared);
      if shared.result.is_none() {
        let waiter: Arc<dyn Waiter<T, E>> = subscription.clone();
        shared.waiters.push(Arc::downgrade(&waiter));
        shared.waiters.retain(|w| w.strong_count() > 0);
        return;
      }
    }
    subscription.settle();
  }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, test_util::Recorder};

  #[test]
  fn value_waits_for_demand() {
    let future = publisher::future(|p: Promise<i32, Never>| p.fulfill(Ok(1)));
    let rec = Recorder::<i32, Never>::with_demand(Demand::NONE, Demand::NONE);
    future.subscribe(rec.clone());
    assert!(rec.values().is_empty());
    rec.request(Demand::max(1));
    assert_eq!(rec.values(), vec![1]);
    assert_eq!(rec.completions(), vec![Completion::Finished]);
  }

  #[test]
  fn late_fulfilment_reaches_every_subscriber() {
    let promise = MutArc::own(None);
    let c_promise = promise.clone();
    let future = publisher::future(move |p: Promise<&'static str, u8>| *c_promise.rc_deref_mut() = Some(p));
    let (a, b) = (Recorder::unlimited(), Recorder::unlimited());
    future.subscribe(a.clone());
    future.subscribe(b.clone());

    let promise = promise.rc_deref_mut().take().unwrap();
    promise.fulfill(Err(3));
    promise.fulfill(Ok("too late"));
    for rec in [a, b] {
      assert_eq!(rec.completions(), vec![Completion::Failure(3)]);
      assert!(rec.values().is_empty());
    }
  }

  #[test]
  fn failure_needs_no_demand() {
    let future = publisher::future(|p: Promise<i32, &'static str>| p.fulfill(Err("no")));
    let rec = Recorder::<i32, &'static str>::with_demand(Demand::NONE, Demand::NONE);
    future.subscribe(rec.clone());
    assert_eq!(rec.completions(), vec![Completion::Failure("no")]);
  }
}
