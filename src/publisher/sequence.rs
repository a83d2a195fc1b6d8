//! Leaf publishers that replay a fixed series of values and a completion.
//!
//! They all share one subscription type, [`Emission`], which hands out
//! values only against demand and finishes right after the last one.

use std::{
  iter::Peekable,
  marker::PhantomData,
  sync::{Arc, Mutex},
};

use tracing::trace;

use crate::{
  completion::Completion,
  demand::Demand,
  publisher::Publisher,
  rc::lock,
  subscriber::Subscriber,
  subscription::{Cancellable, Subscription},
  Never,
};

// ==================== Emission ====================

struct EmissionState<It: Iterator, S: Subscriber> {
  values: Option<Peekable<It>>,
  completion: Option<Completion<S::Failure>>,
  downstream: Option<Arc<S>>,
  demand: Demand,
  emitting: bool,
}

enum Next<T, S: Subscriber> {
  Value(Arc<S>, T),
  Complete(Arc<S>, Completion<S::Failure>),
  Idle,
}

/// Delivers `values`, then `completion`, honoring demand.
///
/// Requests made from inside the downstream's `receive` only add demand;
/// the call already emitting picks them up, so delivery never nests.
pub(crate) struct Emission<It: Iterator, S: Subscriber> {
  state: Mutex<EmissionState<It, S>>,
}

impl<It, S> Emission<It, S>
where
  It: Iterator<Item = S::Input> + Send + 'static,
  S: Subscriber,
{
  /// Subscribes `subscriber` and starts the emission.
  pub fn start(values: It, completion: Completion<S::Failure>, subscriber: S) {
    let downstream = Arc::new(subscriber);
    let emission = Arc::new(Emission {
      state: Mutex::new(EmissionState {
        values: Some(values.peekable()),
        completion: Some(completion),
        downstream: Some(downstream.clone()),
        demand: Demand::NONE,
        emitting: false,
      }),
    });
    downstream.receive_subscription(emission.clone());
    // An empty series completes without waiting for demand.
    emission.request(Demand::NONE);
  }

  fn next(&self) -> Next<S::Input, S> {
    let mut state = lock(&self.state);
    let Some(downstream) = state.downstream.clone() else {
      return Next::Idle;
    };
    let exhausted = state.values.as_mut().map_or(true, |v| v.peek().is_none());
    if exhausted {
      state.values = None;
      state.downstream = None;
      let completion = state.completion.take().unwrap_or(Completion::Finished);
      return Next::Complete(downstream, completion);
    }
    if state.demand == Demand::NONE {
      state.emitting = false;
      return Next::Idle;
    }
    match state.values.as_mut().and_then(Iterator::next) {
      Some(value) => {
        state.demand -= 1;
        Next::Value(downstream, value)
      }
      None => Next::Idle,
    }
  }
}

impl<It: Iterator, S: Subscriber> Cancellable for Emission<It, S> {
  fn cancel(&self) {
    let mut state = lock(&self.state);
    state.values = None;
    state.downstream = None;
  }
}

impl<It, S> Subscription for Emission<It, S>
where
  It: Iterator<Item = S::Input> + Send + 'static,
  S: Subscriber,
{
  fn request(&self, demand: Demand) {
    {
      let mut state = lock(&self.state);
      if state.downstream.is_none() {
        trace!("request ignored: emission is over");
        return;
      }
      state.demand += demand;
      if state.emitting {
        return;
      }
      state.emitting = true;
    }
    loop {
      match self.next() {
        Next::Value(downstream, value) => {
          let more = downstream.receive(value);
          lock(&self.state).demand += more;
        }
        Next::Complete(downstream, completion) => {
          downstream.receive_completion(completion);
          return;
        }
        Next::Idle => return,
      }
    }
  }
}

// ==================== Publishers ====================

/// Publishes every item of an iterable, then finishes.
///
/// The iterable is cloned for every subscriber.
#[derive(Clone)]
pub struct Sequence<I> {
  items: I,
}

impl<I> Sequence<I> {
  pub fn new(items: I) -> Self { Sequence { items } }
}

impl<I> Publisher for Sequence<I>
where
  I: IntoIterator + Clone + Send + Sync + 'static,
  I::IntoIter: Send + 'static,
  I::Item: Send + 'static,
{
  type Output = I::Item;
  type Failure = Never;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = I::Item, Failure = Never>,
  {
    Emission::start(self.items.clone().into_iter(), Completion::Finished, subscriber);
  }
}

/// Publishes one value to each subscriber, then finishes.
#[derive(Clone, Debug)]
pub struct Just<T> {
  value: T,
}

impl<T> Just<T> {
  pub fn new(value: T) -> Self { Just { value } }
}

impl<T: Clone + Send + Sync + 'static> Publisher for Just<T> {
  type Output = T;
  type Failure = Never;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = T, Failure = Never>,
  {
    Emission::start(std::iter::once(self.value.clone()), Completion::Finished, subscriber);
  }
}

/// Publishes nothing. Finishes at once, or never when built with
/// [`Empty::never`].
#[derive(Debug)]
pub struct Empty<O, E> {
  complete_immediately: bool,
  _marker: PhantomData<fn() -> (O, E)>,
}

impl<O, E> Clone for Empty<O, E> {
  fn clone(&self) -> Self { *self }
}

impl<O, E> Copy for Empty<O, E> {}

impl<O, E> Empty<O, E> {
  pub fn new() -> Self { Empty { complete_immediately: true, _marker: PhantomData } }

  /// An empty publisher that never completes.
  pub fn never() -> Self { Empty { complete_immediately: false, _marker: PhantomData } }
}

impl<O, E> Default for Empty<O, E> {
  fn default() -> Self { Self::new() }
}

impl<O: Send + 'static, E: Send + 'static> Publisher for Empty<O, E> {
  type Output = O;
  type Failure = E;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = O, Failure = E>,
  {
    if self.complete_immediately {
      Emission::start(std::iter::empty(), Completion::Finished, subscriber);
    } else {
      subscriber.receive_subscription(crate::subscription::empty());
    }
  }
}

/// Fails every subscriber at once with a clone of `error`.
#[derive(Clone, Debug)]
pub struct Fail<O, E> {
  error: E,
  _marker: PhantomData<fn() -> O>,
}

impl<O, E> Fail<O, E> {
  pub fn new(error: E) -> Self { Fail { error, _marker: PhantomData } }
}

impl<O, E> Publisher for Fail<O, E>
where
  O: Send + 'static,
  E: Clone + Send + Sync + 'static,
{
  type Output = O;
  type Failure = E;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = O, Failure = E>,
  {
    Emission::start(std::iter::empty(), Completion::Failure(self.error.clone()), subscriber);
  }
}

/// Publishes the `Ok` value and finishes, or fails with the `Err`.
#[derive(Clone, Debug)]
pub struct ResultPublisher<T, E> {
  result: Result<T, E>,
}

impl<T, E> ResultPublisher<T, E> {
  pub fn new(result: Result<T, E>) -> Self { ResultPublisher { result } }
}

impl<T, E> Publisher for ResultPublisher<T, E>
where
  T: Clone + Send + Sync + 'static,
  E: Clone + Send + Sync + 'static,
{
  type Output = T;
  type Failure = E;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = T, Failure = E>,
  {
    match self.result.clone() {
      Ok(value) => Emission::start(Some(value).into_iter(), Completion::Finished, subscriber),
      Err(error) => Emission::start(None.into_iter(), Completion::Failure(error), subscriber),
    }
  }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, test_util::Recorder};

  #[test]
  fn sequence_honors_demand() {
    let rec = Recorder::<i32, Never>::with_demand(Demand::max(2), Demand::NONE);
    publisher::from_iter(0..5).subscribe(rec.clone());
    assert_eq!(rec.values(), vec![0, 1]);
    rec.request(Demand::max(2));
    assert_eq!(rec.values(), vec![0, 1, 2, 3]);
    assert!(rec.completions().is_empty());
    rec.request(Demand::max(1));
    assert_eq!(rec.completions(), vec![Completion::Finished]);
  }

  #[test]
  fn finishes_right_after_last_value() {
    let rec = Recorder::<i32, Never>::with_demand(Demand::max(2), Demand::NONE);
    publisher::from_iter(vec![1, 2]).subscribe(rec.clone());
    assert_eq!(rec.completions(), vec![Completion::Finished]);
  }

  #[test]
  fn reentrant_demand_does_not_nest() {
    let rec = Recorder::<i32, Never>::with_demand(Demand::max(1), Demand::max(1));
    publisher::from_iter(0..1000).subscribe(rec.clone());
    assert_eq!(rec.values().len(), 1000);
  }

  #[test]
  fn cancel_stops_emission() {
    let rec = Recorder::<i32, Never>::with_demand(Demand::max(1), Demand::NONE);
    publisher::from_iter(0..5).subscribe(rec.clone());
    rec.cancel();
    rec.request(Demand::UNLIMITED);
    assert_eq!(rec.values(), vec![0]);
    assert!(rec.completions().is_empty());
  }

  #[test]
  fn empty_and_never() {
    let rec = Recorder::<i32, Never>::with_demand(Demand::NONE, Demand::NONE);
    publisher::empty().subscribe(rec.clone());
    assert_eq!(rec.completions(), vec![Completion::Finished]);

    let rec = Recorder::<i32, Never>::unlimited();
    publisher::Empty::never().subscribe(rec.clone());
    assert_eq!(rec.subscriptions(), 1);
    assert!(rec.completions().is_empty());
  }

  #[test]
  fn fail_and_result() {
    let rec = Recorder::<u8, &'static str>::with_demand(Demand::NONE, Demand::NONE);
    publisher::fail("no").subscribe(rec.clone());
    assert_eq!(rec.completions(), vec![Completion::Failure("no")]);

    let rec = Recorder::<u8, &'static str>::unlimited();
    publisher::result(Ok(3)).subscribe(rec.clone());
    assert_eq!(rec.values(), vec![3]);
    assert_eq!(rec.completions(), vec![Completion::Finished]);
  }

  #[test]
  fn option_is_a_sequence() {
    let rec = Recorder::<&'static str, Never>::unlimited();
    publisher::from_iter(Some("only")).subscribe(rec.clone());
    assert_eq!(rec.values(), vec!["only"]);
  }
}
