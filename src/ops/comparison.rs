use std::{cmp::Ordering, marker::PhantomData, sync::Arc};

use crate::{
  channel::{Step, Transform, TransformChannel},
  demand::Demand,
  publisher::Publisher,
  subscriber::Subscriber,
};

#[derive(Clone, Copy)]
pub(crate) enum Keep {
  Min,
  Max,
}

/// Emits the smallest or largest value once the upstream finishes.
///
/// Ties keep the first minimum and the last maximum, like
/// [`Iterator::min_by`] and [`Iterator::max_by`]. An empty upstream just
/// finishes.
pub struct Comparison<P, F> {
  upstream: P,
  compare: Arc<F>,
  keep: Keep,
}

impl<P, F> Comparison<P, F> {
  pub(crate) fn new(upstream: P, compare: F, keep: Keep) -> Self {
    Comparison { upstream, compare: Arc::new(compare), keep }
  }
}

struct ComparisonLogic<F, I, E> {
  compare: Arc<F>,
  keep: Keep,
  best: Option<I>,
  _marker: PhantomData<fn() -> E>,
}

impl<F, I, E> Transform for ComparisonLogic<F, I, E>
where
  F: Fn(&I, &I) -> Ordering + Send + Sync + 'static,
  I: Send + 'static,
  E: Send + 'static,
{
  type Input = I;
  type Output = I;
  type Failure = E;

  fn transform(&mut self, input: I) -> Result<Step<I>, E> {
    let replace = match &self.best {
      None => true,
      Some(best) => {
        let order = (self.compare)(&input, best);
        match self.keep {
          Keep::Min => order == Ordering::Less,
          Keep::Max => order != Ordering::Less,
        }
      }
    };
    if replace {
      self.best = Some(input);
    }
    Ok(Step::Skip)
  }

  fn will_complete(&mut self) -> Result<Option<I>, E> { Ok(self.best.take()) }

  fn upstream_demand(&self, demand: Demand) -> Demand {
    if demand > Demand::NONE { Demand::UNLIMITED } else { Demand::NONE }
  }
}

impl<P, F> Publisher for Comparison<P, F>
where
  P: Publisher,
  F: Fn(&P::Output, &P::Output) -> Ordering + Send + Sync + 'static,
{
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = P::Failure>,
  {
    let logic = ComparisonLogic {
      compare: self.compare.clone(),
      keep: self.keep,
      best: None,
      _marker: PhantomData,
    };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}
