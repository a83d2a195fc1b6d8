//! Operators that consume the whole upstream before emitting.
//!
//! They ask upstream for everything as soon as their downstream asks for
//! anything, and emit their single result right before finishing.

use std::{marker::PhantomData, sync::Arc};

use crate::{
  channel::{Step, Transform, TransformChannel},
  demand::Demand,
  publisher::Publisher,
  subscriber::Subscriber,
  Never,
};

#[inline]
fn all_or_nothing(demand: Demand) -> Demand {
  if demand > Demand::NONE { Demand::UNLIMITED } else { Demand::NONE }
}

/// Folds every value into an accumulator and emits the result when the
/// upstream finishes. An empty upstream emits the initial value.
pub struct Reduce<P, T, F> {
  upstream: P,
  initial: T,
  accumulate: Arc<F>,
}

/// Like [`Reduce`], but a closure error fails the stream.
pub struct TryReduce<P, T, F> {
  upstream: P,
  initial: T,
  accumulate: Arc<F>,
}

/// Emits all values as one `Vec` when the upstream finishes.
pub struct Collect<P> {
  upstream: P,
}

/// Emits the number of values when the upstream finishes.
pub struct Count<P> {
  upstream: P,
}

/// Drops every value and forwards only the completion.
pub struct IgnoreOutput<P> {
  upstream: P,
}

impl<P, T, F> Reduce<P, T, F> {
  pub(crate) fn new(upstream: P, initial: T, accumulate: F) -> Self {
    Reduce { upstream, initial, accumulate: Arc::new(accumulate) }
  }
}

impl<P, T, F> TryReduce<P, T, F> {
  pub(crate) fn new(upstream: P, initial: T, accumulate: F) -> Self {
    TryReduce { upstream, initial, accumulate: Arc::new(accumulate) }
  }
}

impl<P> Collect<P> {
  pub(crate) fn new(upstream: P) -> Self { Collect { upstream } }
}

impl<P> Count<P> {
  pub(crate) fn new(upstream: P) -> Self { Count { upstream } }
}

impl<P> IgnoreOutput<P> {
  pub(crate) fn new(upstream: P) -> Self { IgnoreOutput { upstream } }
}

struct ReduceLogic<F, I, T, E> {
  acc: Option<T>,
  accumulate: Arc<F>,
  _marker: PhantomData<fn(I) -> E>,
}

impl<F, I, T, E> Transform for ReduceLogic<F, I, T, E>
where
  F: Fn(T, I) -> Result<T, E> + Send + Sync + 'static,
  I: Send + 'static,
  T: Send + 'static,
  E: Send + 'static,
{
  type Input = I;
  type Output = T;
  type Failure = E;

  fn transform(&mut self, input: I) -> Result<Step<T>, E> {
    if let Some(acc) = self.acc.take() {
      self.acc = Some((self.accumulate)(acc, input)?);
    }
    Ok(Step::Skip)
  }

  fn will_complete(&mut self) -> Result<Option<T>, E> { Ok(self.acc.take()) }

  fn upstream_demand(&self, demand: Demand) -> Demand { all_or_nothing(demand) }
}

impl<P, T, F> Publisher for Reduce<P, T, F>
where
  P: Publisher,
  T: Clone + Send + Sync + 'static,
  F: Fn(T, P::Output) -> T + Send + Sync + 'static,
{
  type Output = T;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = T, Failure = P::Failure>,
  {
    let accumulate = self.accumulate.clone();
    let logic = ReduceLogic {
      acc: Some(self.initial.clone()),
      accumulate: Arc::new(move |acc: T, v: P::Output| -> Result<T, P::Failure> { Ok(accumulate(acc, v)) }),
      _marker: PhantomData,
    };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}

impl<P, T, F> Publisher for TryReduce<P, T, F>
where
  P: Publisher,
  T: Clone + Send + Sync + 'static,
  F: Fn(T, P::Output) -> Result<T, P::Failure> + Send + Sync + 'static,
{
  type Output = T;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = T, Failure = P::Failure>,
  {
    let logic = ReduceLogic {
      acc: Some(self.initial.clone()),
      accumulate: self.accumulate.clone(),
      _marker: PhantomData,
    };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}

struct CollectLogic<I, E> {
  items: Vec<I>,
  _marker: PhantomData<fn() -> E>,
}

impl<I: Send + 'static, E: Send + 'static> Transform for CollectLogic<I, E> {
  type Input = I;
  type Output = Vec<I>;
  type Failure = E;

  fn transform(&mut self, input: I) -> Result<Step<Vec<I>>, E> {
    self.items.push(input);
    Ok(Step::Skip)
  }

  fn will_complete(&mut self) -> Result<Option<Vec<I>>, E> { Ok(Some(std::mem::take(&mut self.items))) }

  fn upstream_demand(&self, demand: Demand) -> Demand { all_or_nothing(demand) }
}

impl<P: Publisher> Publisher for Collect<P> {
  type Output = Vec<P::Output>;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = Vec<P::Output>, Failure = P::Failure>,
  {
    let logic = CollectLogic { items: vec![], _marker: PhantomData };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}

struct CountLogic<I, E> {
  count: usize,
  _marker: PhantomData<fn(I) -> E>,
}

impl<I: Send + 'static, E: Send + 'static> Transform for CountLogic<I, E> {
  type Input = I;
  type Output = usize;
  type Failure = E;

  fn transform(&mut self, _: I) -> Result<Step<usize>, E> {
    self.count += 1;
    Ok(Step::Skip)
  }

  fn will_complete(&mut self) -> Result<Option<usize>, E> { Ok(Some(self.count)) }

  fn upstream_demand(&self, demand: Demand) -> Demand { all_or_nothing(demand) }
}

impl<P: Publisher> Publisher for Count<P> {
  type Output = usize;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = usize, Failure = P::Failure>,
  {
    let logic = CountLogic { count: 0, _marker: PhantomData };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}

struct IgnoreLogic<I, E>(PhantomData<fn(I) -> E>);

impl<I: Send + 'static, E: Send + 'static> Transform for IgnoreLogic<I, E> {
  type Input = I;
  type Output = Never;
  type Failure = E;

  fn transform(&mut self, _: I) -> Result<Step<Never>, E> { Ok(Step::Skip) }

  fn upstream_demand(&self, _: Demand) -> Demand { Demand::UNLIMITED }
}

impl<P: Publisher> Publisher for IgnoreOutput<P> {
  type Output = Never;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = Never, Failure = P::Failure>,
  {
    self.upstream.subscribe(TransformChannel::new(IgnoreLogic(PhantomData), subscriber));
  }
}

#[cfg(test)]
mod tests {
  use crate::{
    prelude::*,
    test_util::{Manual, Recorder},
  };

  #[test]
  fn reduce_initial() {
    let rec = Recorder::<i32, Never>::unlimited();
    publisher::from_iter(vec![1, 1, 1, 1, 1]).reduce(100, |acc, v| acc + v).subscribe(rec.clone());
    assert_eq!(rec.values(), vec![105]);
    assert_eq!(rec.completions(), vec![Completion::Finished]);
  }

  #[test]
  fn reduce_on_empty_emits_initial() {
    let rec = Recorder::<i32, Never>::unlimited();
    publisher::empty::<i32, Never>().reduce(100, |acc, v| acc + v).subscribe(rec.clone());
    assert_eq!(rec.values(), vec![100]);
  }

  #[test]
  fn reduce_failure_emits_nothing() {
    let upstream = Manual::<i32, &'static str>::new();
    let rec = Recorder::unlimited();
    upstream.clone().reduce(0, |acc, v| acc + v).subscribe(rec.clone());
    upstream.send(1);
    upstream.complete(Completion::Failure("lost"));
    assert!(rec.values().is_empty());
    assert_eq!(rec.completions(), vec![Completion::Failure("lost")]);
  }

  #[test]
  fn try_reduce_error() {
    let rec = Recorder::<i32, &'static str>::unlimited();
    publisher::from_iter(vec![1, 2, 3])
      .set_failure_type::<&'static str>()
      .try_reduce(0, |acc, v| if v == 2 { Err("two") } else { Ok(acc + v) })
      .subscribe(rec.clone());
    assert!(rec.values().is_empty());
    assert_eq!(rec.completions(), vec![Completion::Failure("two")]);
  }

  #[test]
  fn accumulators_pull_everything() {
    let upstream = Manual::<i32, Never>::new();
    let rec = Recorder::with_demand(Demand::max(1), Demand::NONE);
    upstream.clone().collect().subscribe(rec.clone());
    assert_eq!(upstream.requests(), vec![Demand::UNLIMITED]);
    upstream.send(1);
    upstream.send(2);
    upstream.complete(Completion::Finished);
    assert_eq!(rec.values(), vec![vec![1, 2]]);
  }

  #[test]
  fn collect_empty() {
    let rec = Recorder::<Vec<i32>, Never>::unlimited();
    publisher::empty().collect().subscribe(rec.clone());
    assert_eq!(rec.values(), vec![Vec::<i32>::new()]);
  }

  #[test]
  fn count() {
    let rec = Recorder::<usize, Never>::unlimited();
    publisher::from_iter("hello".chars()).count().subscribe(rec.clone());
    assert_eq!(rec.values(), vec![5]);
  }

  #[test]
  fn ignore_output_keeps_completion() {
    let rec = Recorder::<Never, Never>::unlimited();
    publisher::from_iter(0..3).ignore_output().subscribe(rec.clone());
    assert_eq!(rec.events().len(), 2);
    assert_eq!(rec.completions(), vec![Completion::Finished]);
  }
}
