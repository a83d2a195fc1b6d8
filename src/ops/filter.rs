use std::{marker::PhantomData, sync::Arc};

use crate::{
  channel::{Step, Transform, TransformChannel},
  publisher::Publisher,
  subscriber::Subscriber,
};

/// Republishes only the values that satisfy a predicate.
///
/// ```rust
/// use traffic::prelude::*;
///
/// let evens = MutArc::own(vec![]);
/// let c_evens = evens.clone();
/// let _c = publisher::from_iter(0..10)
///   .filter(|v| v % 2 == 0)
///   .sink_value(move |v| c_evens.rc_deref_mut().push(v));
/// assert_eq!(evens.get(), vec![0, 2, 4, 6, 8]);
/// ```
pub struct Filter<P, F> {
  upstream: P,
  predicate: Arc<F>,
}

/// Like [`Filter`], but a predicate error fails the stream.
pub struct TryFilter<P, F> {
  upstream: P,
  predicate: Arc<F>,
}

/// Maps every value and drops the `None` results.
pub struct CompactMap<P, F> {
  upstream: P,
  transform: Arc<F>,
}

/// Like [`CompactMap`], but a closure error fails the stream.
pub struct TryCompactMap<P, F> {
  upstream: P,
  transform: Arc<F>,
}

macro_rules! impl_new {
  ($($name:ident { $field:ident }),*) => {
    $(impl<P, F> $name<P, F> {
      pub(crate) fn new(upstream: P, $field: F) -> Self { $name { upstream, $field: Arc::new($field) } }
    })*
  };
}

impl_new!(
  Filter { predicate },
  TryFilter { predicate },
  CompactMap { transform },
  TryCompactMap { transform }
);

/// Passes the input through or drops it. Shared by the filtering family.
struct FilterLogic<F, I, E> {
  predicate: Arc<F>,
  _marker: PhantomData<fn(I) -> E>,
}

impl<F, I, E> Transform for FilterLogic<F, I, E>
where
  F: Fn(&I) -> Result<bool, E> + Send + Sync + 'static,
  I: Send + 'static,
  E: Send + 'static,
{
  type Input = I;
  type Output = I;
  type Failure = E;

  fn transform(&mut self, input: I) -> Result<Step<I>, E> {
    Ok(if (self.predicate)(&input)? { Step::Emit(input) } else { Step::Skip })
  }
}

struct CompactMapLogic<F, I, E> {
  transform: Arc<F>,
  _marker: PhantomData<fn(I) -> E>,
}

impl<F, I, U, E> Transform for CompactMapLogic<F, I, E>
where
  F: Fn(I) -> Result<Option<U>, E> + Send + Sync + 'static,
  I: Send + 'static,
  U: Send + 'static,
  E: Send + 'static,
{
  type Input = I;
  type Output = U;
  type Failure = E;

  fn transform(&mut self, input: I) -> Result<Step<U>, E> {
    Ok((self.transform)(input)?.map_or(Step::Skip, Step::Emit))
  }
}

impl<P, F> Publisher for Filter<P, F>
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
    let logic = FilterLogic {
      predicate: Arc::new(move |v: &P::Output| -> Result<bool, P::Failure> { Ok(predicate(v)) }),
      _marker: PhantomData,
    };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}

impl<P, F> Publisher for TryFilter<P, F>
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
    let logic = FilterLogic { predicate: self.predicate.clone(), _marker: PhantomData };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}

impl<P, F, U> Publisher for CompactMap<P, F>
where
  P: Publisher,
  F: Fn(P::Output) -> Option<U> + Send + Sync + 'static,
  U: Send + 'static,
{
  type Output = U;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = U, Failure = P::Failure>,
  {
    let transform = self.transform.clone();
    let logic = CompactMapLogic {
      transform: Arc::new(move |v: P::Output| -> Result<Option<U>, P::Failure> { Ok(transform(v)) }),
      _marker: PhantomData,
    };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}

impl<P, F, U> Publisher for TryCompactMap<P, F>
where
  P: Publisher,
  F: Fn(P::Output) -> Result<Option<U>, P::Failure> + Send + Sync + 'static,
  U: Send + 'static,
{
  type Output = U;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = U, Failure = P::Failure>,
  {
    let logic = CompactMapLogic { transform: self.transform.clone(), _marker: PhantomData };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}
