use std::{marker::PhantomData, sync::Arc};

use crate::{
  channel::{Step, Transform, TransformChannel},
  publisher::Publisher,
  subscriber::Subscriber,
};

/// Drops a value when the closure says it duplicates the previously
/// republished one.
///
/// `remove_duplicates()` compares with `==`, `remove_duplicates_by` takes
/// an "are these equal" closure.
pub struct RemoveDuplicates<P, F> {
  upstream: P,
  predicate: Arc<F>,
}

/// Like [`RemoveDuplicates`], but a closure error fails the stream.
pub struct TryRemoveDuplicates<P, F> {
  upstream: P,
  predicate: Arc<F>,
}

impl<P, F> RemoveDuplicates<P, F> {
  pub(crate) fn new(upstream: P, predicate: F) -> Self {
    RemoveDuplicates { upstream, predicate: Arc::new(predicate) }
  }
}

impl<P, F> TryRemoveDuplicates<P, F> {
  pub(crate) fn new(upstream: P, predicate: F) -> Self {
    TryRemoveDuplicates { upstream, predicate: Arc::new(predicate) }
  }
}

struct DedupLogic<F, I, E> {
  last: Option<I>,
  predicate: Arc<F>,
  _marker: PhantomData<fn() -> E>,
}

impl<F, I, E> Transform for DedupLogic<F, I, E>
where
  F: Fn(&I, &I) -> Result<bool, E> + Send + Sync + 'static,
  I: Clone + Send + 'static,
  E: Send + 'static,
{
  type Input = I;
  type Output = I;
  type Failure = E;

  fn transform(&mut self, input: I) -> Result<Step<I>, E> {
    if let Some(last) = &self.last {
      if (self.predicate)(last, &input)? {
        return Ok(Step::Replenish);
      }
    }
    self.last = Some(input.clone());
    Ok(Step::Emit(input))
  }
}

impl<P, F> Publisher for RemoveDuplicates<P, F>
where
  P: Publisher,
  P::Output: Clone,
  F: Fn(&P::Output, &P::Output) -> bool + Send + Sync + 'static,
{
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = P::Failure>,
  {
    let predicate = self.predicate.clone();
    let logic = DedupLogic {
      last: None,
      predicate: Arc::new(move |a: &P::Output, b: &P::Output| -> Result<bool, P::Failure> {
        Ok(predicate(a, b))
      }),
      _marker: PhantomData,
    };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}

impl<P, F> Publisher for TryRemoveDuplicates<P, F>
where
  P: Publisher,
  P::Output: Clone,
  F: Fn(&P::Output, &P::Output) -> Result<bool, P::Failure> + Send + Sync + 'static,
{
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = P::Failure>,
  {
    let logic = DedupLogic { last: None, predicate: self.predicate.clone(), _marker: PhantomData };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}
