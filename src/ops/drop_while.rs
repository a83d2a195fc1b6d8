use std::{marker::PhantomData, sync::Arc};

use crate::{
  channel::{Step, Transform, TransformChannel},
  publisher::Publisher,
  subscriber::Subscriber,
};

/// Drops values while a predicate holds, then republishes everything.
pub struct DropWhile<P, F> {
  upstream: P,
  predicate: Arc<F>,
}

/// Like [`DropWhile`], but a predicate error fails the stream.
pub struct TryDropWhile<P, F> {
  upstream: P,
  predicate: Arc<F>,
}

impl<P, F> DropWhile<P, F> {
  pub(crate) fn new(upstream: P, predicate: F) -> Self { DropWhile { upstream, predicate: Arc::new(predicate) } }
}

impl<P, F> TryDropWhile<P, F> {
  pub(crate) fn new(upstream: P, predicate: F) -> Self { TryDropWhile { upstream, predicate: Arc::new(predicate) } }
}

struct DropWhileLogic<F, I, E> {
  predicate: Arc<F>,
  dropping: bool,
  _marker: PhantomData<fn(I) -> E>,
}

impl<F, I, E> Transform for DropWhileLogic<F, I, E>
where
  F: Fn(&I) -> Result<bool, E> + Send + Sync + 'static,
  I: Send + 'static,
  E: Send + 'static,
{
  type Input = I;
  type Output = I;
  type Failure = E;

  fn transform(&mut self, input: I) -> Result<Step<I>, E> {
    if self.dropping && (self.predicate)(&input)? {
      return Ok(Step::Replenish);
    }
    self.dropping = false;
    Ok(Step::Emit(input))
  }
}

impl<P, F> Publisher for DropWhile<P, F>
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
    let logic = DropWhileLogic {
      predicate: Arc::new(move |v: &P::Output| -> Result<bool, P::Failure> { Ok(predicate(v)) }),
      dropping: true,
      _marker: PhantomData,
    };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}

impl<P, F> Publisher for TryDropWhile<P, F>
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
    let logic = DropWhileLogic { predicate: self.predicate.clone(), dropping: true, _marker: PhantomData };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, test_util::Recorder};

  #[test]
  fn drops_leading_values_only() {
    let rec = Recorder::<i32, Never>::unlimited();
    publisher::from_iter(vec![1, 2, 5, 1, 2]).drop_while(|v| *v < 3).subscribe(rec.clone());
    assert_eq!(rec.values(), vec![5, 1, 2]);
  }

  #[test]
  fn demand_is_preserved_while_dropping() {
    let rec = Recorder::<i32, Never>::with_demand(Demand::max(2), Demand::NONE);
    publisher::from_iter(0..100).drop_while(|v| *v < 50).subscribe(rec.clone());
    assert_eq!(rec.values(), vec![50, 51]);
  }

  #[test]
  fn try_drop_while_error() {
    let rec = Recorder::<i32, &'static str>::unlimited();
    publisher::from_iter(0..5)
      .set_failure_type::<&'static str>()
      .try_drop_while(|v| if *v == 1 { Err("one") } else { Ok(true) })
      .subscribe(rec.clone());
    assert_eq!(rec.completions(), vec![Completion::Failure("one")]);
  }
}
