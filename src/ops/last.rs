use std::{marker::PhantomData, sync::Arc};

use crate::{
  channel::{Step, Transform, TransformChannel},
  demand::Demand,
  publisher::Publisher,
  subscriber::Subscriber,
};

/// Emits the last value that satisfies a predicate once the upstream
/// finishes.
///
/// `last()` is the same with a predicate that accepts everything.
pub struct LastWhere<P, F> {
  upstream: P,
  predicate: Arc<F>,
}

/// Like [`LastWhere`], but a predicate error fails the stream.
pub struct TryLastWhere<P, F> {
  upstream: P,
  predicate: Arc<F>,
}

pub type Last<P> = LastWhere<P, fn(&<P as Publisher>::Output) -> bool>;

impl<P, F> LastWhere<P, F> {
  pub(crate) fn new(upstream: P, predicate: F) -> Self { LastWhere { upstream, predicate: Arc::new(predicate) } }
}

impl<P, F> TryLastWhere<P, F> {
  pub(crate) fn new(upstream: P, predicate: F) -> Self { TryLastWhere { upstream, predicate: Arc::new(predicate) } }
}

struct LastLogic<F, I, E> {
  predicate: Arc<F>,
  last: Option<I>,
  _marker: PhantomData<fn() -> E>,
}

impl<F, I, E> Transform for LastLogic<F, I, E>
where
  F: Fn(&I) -> Result<bool, E> + Send + Sync + 'static,
  I: Send + 'static,
  E: Send + 'static,
{
  type Input = I;
  type Output = I;
  type Failure = E;

  fn transform(&mut self, input: I) -> Result<Step<I>, E> {
    if (self.predicate)(&input)? {
      self.last = Some(input);
    }
    Ok(Step::Skip)
  }

  fn will_complete(&mut self) -> Result<Option<I>, E> { Ok(self.last.take()) }

  fn upstream_demand(&self, demand: Demand) -> Demand {
    if demand > Demand::NONE { Demand::UNLIMITED } else { Demand::NONE }
  }
}

impl<P, F> Publisher for LastWhere<P, F>
where
  P: Publisher,
  F: Fn(&P::Output) -> bool + Send + Sync + 'static,
{
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = P::Failure>,
  {
    let predicate = self.predicate.clone();
    let logic = LastLogic {
      predicate: Arc::new(move |v: &P::Output| -> Result<bool, P::Failure> { Ok(predicate(v)) }),
      last: None,
      _marker: PhantomData,
    };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}

impl<P, F> Publisher for TryLastWhere<P, F>
where
  P: Publisher,
  F: Fn(&P::Output) -> Result<bool, P::Failure> + Send + Sync + 'static,
{
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = P::Failure>,
  {
    let logic = LastLogic { predicate: self.predicate.clone(), last: None, _marker: PhantomData };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}

#[cfg(test)]
mod tests {
  use crate::{
    prelude::*,
    test_util::{Manual, Recorder},
  };

  #[test]
  fn last() {
    let rec = Recorder::<i32, Never>::unlimited();
    publisher::from_iter(0..5).last().subscribe(rec.clone());
    assert_eq!(rec.values(), vec![4]);
    assert_eq!(rec.completions(), vec![Completion::Finished]);
  }

  #[test]
  fn last_where_flushes_on_finish_only() {
    let upstream = Manual::<i32, &'static str>::new();
    let rec = Recorder::unlimited();
    upstream.clone().last_where(|v| v % 2 == 0).subscribe(rec.clone());
    upstream.send(2);
    upstream.send(4);
    upstream.send(5);
    assert!(rec.values().is_empty());
    upstream.complete(Completion::Finished);
    assert_eq!(rec.values(), vec![4]);
  }

  #[test]
  fn try_last_where_error() {
    let rec = Recorder::<i32, &'static str>::unlimited();
    publisher::from_iter(0..5)
      .set_failure_type::<&'static str>()
      .try_last_where(|v| if *v == 4 { Err("four") } else { Ok(true) })
      .subscribe(rec.clone());
    assert!(rec.values().is_empty());
    assert_eq!(rec.completions(), vec![Completion::Failure("four")]);
  }
}
