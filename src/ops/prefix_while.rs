use std::{marker::PhantomData, sync::Arc};

use crate::{
  channel::{Step, Transform, TransformChannel},
  publisher::Publisher,
  subscriber::Subscriber,
};

/// Republishes values while a predicate holds, then finishes and cancels
/// the upstream.
pub struct PrefixWhile<P, F> {
  upstream: P,
  predicate: Arc<F>,
}

/// Like [`PrefixWhile`], but a predicate error fails the stream.
pub struct TryPrefixWhile<P, F> {
  upstream: P,
  predicate: Arc<F>,
}

impl<P, F> PrefixWhile<P, F> {
  pub(crate) fn new(upstream: P, predicate: F) -> Self { PrefixWhile { upstream, predicate: Arc::new(predicate) } }
}

impl<P, F> TryPrefixWhile<P, F> {
  pub(crate) fn new(upstream: P, predicate: F) -> Self { TryPrefixWhile { upstream, predicate: Arc::new(predicate) } }
}

struct PrefixWhileLogic<F, I, E> {
  predicate: Arc<F>,
  _marker: PhantomData<fn(I) -> E>,
}

impl<F, I, E> Transform for PrefixWhileLogic<F, I, E>
where
  F: Fn(&I) -> Result<bool, E> + Send + Sync + 'static,
  I: Send + 'static,
  E: Send + 'static,
{
  type Input = I;
  type Output = I;
  type Failure = E;

  fn transform(&mut self, input: I) -> Result<Step<I>, E> {
    Ok(if (self.predicate)(&input)? { Step::Emit(input) } else { Step::Finish })
  }
}

impl<P, F> Publisher for PrefixWhile<P, F>
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
    let logic = PrefixWhileLogic {
      predicate: Arc::new(move |v: &P::Output| -> Result<bool, P::Failure> { Ok(predicate(v)) }),
      _marker: PhantomData,
    };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}

impl<P, F> Publisher for TryPrefixWhile<P, F>
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
    let logic = PrefixWhileLogic { predicate: self.predicate.clone(), _marker: PhantomData };
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
  fn stops_at_first_failure() {
    let upstream = Manual::<i32, Never>::new();
    let rec = Recorder::unlimited();
    upstream.clone().prefix_while(|v| *v < 3).subscribe(rec.clone());
    for v in [1, 2, 3, 1] {
      upstream.send(v);
    }
    assert_eq!(rec.values(), vec![1, 2]);
    assert_eq!(rec.completions(), vec![Completion::Finished]);
    assert_eq!(upstream.cancels(), 1);
  }

  #[test]
  fn try_prefix_while_error() {
    let rec = Recorder::<i32, &'static str>::unlimited();
    publisher::from_iter(0..5)
      .set_failure_type::<&'static str>()
      .try_prefix_while(|v| if *v == 2 { Err("two") } else { Ok(true) })
      .subscribe(rec.clone());
    assert_eq!(rec.values(), vec![0, 1]);
    assert_eq!(rec.completions(), vec![Completion::Failure("two")]);
  }
}
