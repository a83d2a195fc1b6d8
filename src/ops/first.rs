use std::{marker::PhantomData, sync::Arc};

use crate::{
  channel::{Step, Transform, TransformChannel},
  demand::Demand,
  publisher::Publisher,
  subscriber::Subscriber,
};

/// Emits the first value that satisfies a predicate, then finishes and
/// cancels the upstream.
///
/// `first()` is the same with a predicate that accepts everything.
pub struct FirstWhere<P, F> {
  upstream: P,
  predicate: Arc<F>,
}

/// Like [`FirstWhere`], but a predicate error fails the stream.
pub struct TryFirstWhere<P, F> {
  upstream: P,
  predicate: Arc<F>,
}

/// The predicate used by `first()`.
pub type First<P> = FirstWhere<P, fn(&<P as Publisher>::Output) -> bool>;

impl<P, F> FirstWhere<P, F> {
  pub(crate) fn new(upstream: P, predicate: F) -> Self { FirstWhere { upstream, predicate: Arc::new(predicate) } }
}

impl<P, F> TryFirstWhere<P, F> {
  pub(crate) fn new(upstream: P, predicate: F) -> Self { TryFirstWhere { upstream, predicate: Arc::new(predicate) } }
}

struct FirstLogic<F, I, E> {
  predicate: Arc<F>,
  _marker: PhantomData<fn(I) -> E>,
}

impl<F, I, E> Transform for FirstLogic<F, I, E>
where
  F: Fn(&I) -> Result<bool, E> + Send + Sync + 'static,
  I: Send + 'static,
  E: Send + 'static,
{
  type Input = I;
  type Output = I;
  type Failure = E;

  fn transform(&mut self, input: I) -> Result<Step<I>, E> {
    Ok(if (self.predicate)(&input)? { Step::EmitAndFinish(input) } else { Step::Skip })
  }

  fn upstream_demand(&self, demand: Demand) -> Demand {
    if demand > Demand::NONE { Demand::UNLIMITED } else { Demand::NONE }
  }
}

impl<P, F> Publisher for FirstWhere<P, F>
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
    let logic = FirstLogic {
      predicate: Arc::new(move |v: &P::Output| -> Result<bool, P::Failure> { Ok(predicate(v)) }),
      _marker: PhantomData,
    };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}

impl<P, F> Publisher for TryFirstWhere<P, F>
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
    let logic = FirstLogic { predicate: self.predicate.clone(), _marker: PhantomData };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}
