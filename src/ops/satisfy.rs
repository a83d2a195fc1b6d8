use std::{marker::PhantomData, sync::Arc};

use crate::{
  channel::{Step, Transform, TransformChannel},
  demand::Demand,
  publisher::Publisher,
  subscriber::Subscriber,
};

#[derive(Clone, Copy)]
enum Mode {
  /// Stop with `false` at the first value that fails the predicate.
  All,
  /// Stop with `true` at the first value that passes the predicate.
  Any,
}

/// Emits whether every value satisfies a predicate.
pub struct AllSatisfy<P, F> {
  upstream: P,
  predicate: Arc<F>,
}

/// Like [`AllSatisfy`], but a predicate error fails the stream.
pub struct TryAllSatisfy<P, F> {
  upstream: P,
  predicate: Arc<F>,
}

/// Emits whether any value satisfies a predicate.
pub struct ContainsWhere<P, F> {
  upstream: P,
  predicate: Arc<F>,
}

/// Like [`ContainsWhere`], but a predicate error fails the stream.
pub struct TryContainsWhere<P, F> {
  upstream: P,
  predicate: Arc<F>,
}

/// Emits whether the upstream produces a value equal to the given one.
pub struct Contains<P, T> {
  upstream: P,
  value: Arc<T>,
}

macro_rules! impl_new {
  ($($name:ident),*) => {
    $(impl<P, F> $name<P, F> {
      pub(crate) fn new(upstream: P, predicate: F) -> Self { $name { upstream, predicate: Arc::new(predicate) } }
    })*
  };
}

impl_new!(AllSatisfy, TryAllSatisfy, ContainsWhere, TryContainsWhere);

impl<P, T> Contains<P, T> {
  pub(crate) fn new(upstream: P, value: T) -> Self { Contains { upstream, value: Arc::new(value) } }
}

struct SatisfyLogic<F, I, E> {
  predicate: Arc<F>,
  mode: Mode,
  _marker: PhantomData<fn(I) -> E>,
}

impl<F, I, E> Transform for SatisfyLogic<F, I, E>
where
  F: Fn(&I) -> Result<bool, E> + Send + Sync + 'static,
  I: Send + 'static,
  E: Send + 'static,
{
  type Input = I;
  type Output = bool;
  type Failure = E;

  fn transform(&mut self, input: I) -> Result<Step<bool>, E> {
    let passed = (self.predicate)(&input)?;
    Ok(match (self.mode, passed) {
      (Mode::All, false) => Step::EmitAndFinish(false),
      (Mode::Any, true) => Step::EmitAndFinish(true),
      _ => Step::Skip,
    })
  }

  fn will_complete(&mut self) -> Result<Option<bool>, E> { Ok(Some(matches!(self.mode, Mode::All))) }

  fn upstream_demand(&self, demand: Demand) -> Demand {
    if demand > Demand::NONE { Demand::UNLIMITED } else { Demand::NONE }
  }
}

fn subscribe_with<P, F, S>(upstream: &P, predicate: Arc<F>, mode: Mode, subscriber: S)
where
  P: Publisher,
  F: Fn(&P::Output) -> Result<bool, P::Failure> + Send + Sync + 'static,
  S: Subscriber<Input = bool, Failure = P::Failure>,
{
  let logic = SatisfyLogic { predicate, mode, _marker: PhantomData };
  upstream.subscribe(TransformChannel::new(logic, subscriber));
}

macro_rules! impl_publisher {
  ($name:ident, $mode:expr, infallible) => {
    impl<P, F> Publisher for $name<P, F>
    where
      P: Publisher,
      F: Fn(&P::Output) -> bool + Send + Sync + 'static,
    {
      type Output = bool;
      type Failure = P::Failure;

      fn subscribe<S>(&self, subscriber: S)
      where
        S: Subscriber<Input = bool, Failure = P::Failure>,
      {
        let predicate = self.predicate.clone();
        let predicate = Arc::new(move |v: &P::Output| -> Result<bool, P::Failure> { Ok(predicate(v)) });
        subscribe_with(&self.upstream, predicate, $mode, subscriber);
      }
    }
  };
  ($name:ident, $mode:expr, fallible) => {
    impl<P, F> Publisher for $name<P, F>
    where
      P: Publisher,
      F: Fn(&P::Output) -> Result<bool, P::Failure> + Send + Sync + 'static,
    {
      type Output = bool;
      type Failure = P::Failure;

      fn subscribe<S>(&self, subscriber: S)
      where
        S: Subscriber<Input = bool, Failure = P::Failure>,
      {
        subscribe_with(&self.upstream, self.predicate.clone(), $mode, subscriber);
      }
    }
  };
}

impl_publisher!(AllSatisfy, Mode::All, infallible);
impl_publisher!(TryAllSatisfy, Mode::All, fallible);
impl_publisher!(ContainsWhere, Mode::Any, infallible);
impl_publisher!(TryContainsWhere, Mode::Any, fallible);

impl<P, T> Publisher for Contains<P, T>
where
  P: Publisher<Output = T>,
  T: PartialEq + Send + Sync + 'static,
{
  type Output = bool;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = bool, Failure = P::Failure>,
  {
    let value = self.value.clone();
    let predicate = Arc::new(move |v: &T| -> Result<bool, P::Failure> { Ok(*v == *value) });
    subscribe_with(&self.upstream, predicate, Mode::Any, subscriber);
  }
}

#[cfg(test)]
mod tests {
  use crate::{
    prelude::*,
    test_util::{Manual, Recorder},
  };

  #[test]
  fn all_satisfy_short_circuits() {
    let upstream = Manual::<i32, Never>::new();
    let rec = Recorder::unlimited();
    upstream.clone().all_satisfy(|v| *v > 0).subscribe(rec.clone());
    upstream.send(1);
    upstream.send(-1);
    upstream.send(2);
    assert_eq!(rec.values(), vec![false]);
    assert_eq!(rec.completions(), vec![Completion::Finished]);
    assert_eq!(upstream.cancels(), 1);
  }

  #[test]
  fn all_satisfy_on_finish() {
    let rec = Recorder::<bool, Never>::unlimited();
    publisher::from_iter(1..4).all_satisfy(|v| *v > 0).subscribe(rec.clone());
    assert_eq!(rec.values(), vec![true]);
  }

  #[test]
  fn try_all_satisfy_error() {
    let rec = Recorder::<bool, &'static str>::unlimited();
    publisher::from_iter(1..4)
      .set_failure_type::<&'static str>()
      .try_all_satisfy(|v| if *v == 2 { Err("two") } else { Ok(true) })
      .subscribe(rec.clone());
    assert!(rec.values().is_empty());
    assert_eq!(rec.completions(), vec![Completion::Failure("two")]);
  }

  #[test]
  fn contains() {
    let hit = Recorder::<bool, Never>::unlimited();
    let miss = Recorder::<bool, Never>::unlimited();
    publisher::from_iter(vec!["a", "b"]).contains("b").subscribe(hit.clone());
    publisher::from_iter(vec!["a", "b"]).contains("z").subscribe(miss.clone());
    assert_eq!(hit.values(), vec![true]);
    assert_eq!(miss.values(), vec![false]);
  }

  #[test]
  fn contains_where_and_try() {
    let rec = Recorder::<bool, Never>::unlimited();
    publisher::from_iter(0..10).contains_where(|v| v * v == 49).subscribe(rec.clone());
    assert_eq!(rec.values(), vec![true]);

    let rec = Recorder::<bool, String>::unlimited();
    publisher::from_iter(0..10)
      .set_failure_type::<String>()
      .try_contains_where(|v| if *v > 3 { Err(format!("{v}")) } else { Ok(false) })
      .subscribe(rec.clone());
    assert_eq!(rec.completions(), vec![Completion::Failure("4".to_string())]);
  }
}
