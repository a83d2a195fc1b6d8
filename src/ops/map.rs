use std::{marker::PhantomData, sync::Arc};

use crate::{
  channel::{Step, Transform, TransformChannel},
  publisher::Publisher,
  subscriber::Subscriber,
};

/// Transforms every value with a closure.
///
/// ```rust
/// use traffic::prelude::*;
///
/// let doubled = MutArc::own(vec![]);
/// let c_doubled = doubled.clone();
/// let _c = publisher::from_iter(1..=3)
///   .map(|v| v * 2)
///   .sink_value(move |v| c_doubled.rc_deref_mut().push(v));
/// assert_eq!(doubled.get(), vec![2, 4, 6]);
/// ```
pub struct Map<P, F> {
  upstream: P,
  transform: Arc<F>,
}

/// Like [`Map`], but a closure error fails the stream.
pub struct TryMap<P, F> {
  upstream: P,
  transform: Arc<F>,
}

impl<P, F> Map<P, F> {
  pub(crate) fn new(upstream: P, transform: F) -> Self { Map { upstream, transform: Arc::new(transform) } }
}

impl<P, F> TryMap<P, F> {
  pub(crate) fn new(upstream: P, transform: F) -> Self { TryMap { upstream, transform: Arc::new(transform) } }
}

struct MapLogic<F, I, E> {
  transform: Arc<F>,
  _marker: PhantomData<fn(I) -> E>,
}

impl<F, I, U, E> Transform for MapLogic<F, I, E>
where
  F: Fn(I) -> U + Send + Sync + 'static,
  I: Send + 'static,
  U: Send + 'static,
  E: Send + 'static,
{
  type Input = I;
  type Output = U;
  type Failure = E;

  fn transform(&mut self, input: I) -> Result<Step<U>, E> { Ok(Step::Emit((self.transform)(input))) }
}

struct TryMapLogic<F, I> {
  transform: Arc<F>,
  _marker: PhantomData<fn(I)>,
}

impl<F, I, U, E> Transform for TryMapLogic<F, I>
where
  F: Fn(I) -> Result<U, E> + Send + Sync + 'static,
  I: Send + 'static,
  U: Send + 'static,
  E: Send + 'static,
{
  type Input = I;
  type Output = U;
  type Failure = E;

  fn transform(&mut self, input: I) -> Result<Step<U>, E> { (self.transform)(input).map(Step::Emit) }
}

impl<P, F, U> Publisher for Map<P, F>
where
  P: Publisher,
  F: Fn(P::Output) -> U + Send + Sync + 'static,
  U: Send + 'static,
{
  type Output = U;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = U, Failure = P::Failure>,
  {
    let logic = MapLogic { transform: self.transform.clone(), _marker: PhantomData };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}

impl<P, F, U> Publisher for TryMap<P, F>
where
  P: Publisher,
  F: Fn(P::Output) -> Result<U, P::Failure> + Send + Sync + 'static,
  U: Send + 'static,
{
  type Output = U;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = U, Failure = P::Failure>,
  {
    let logic = TryMapLogic { transform: self.transform.clone(), _marker: PhantomData };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}
