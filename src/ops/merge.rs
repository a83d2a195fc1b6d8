use std::collections::VecDeque;

use crate::{
  ops::fan_in::{unbox, Aggregate, Boxed, Gather, Slot},
  publisher::Publisher,
  subscriber::Subscriber,
};

/// Interleaves the values of several upstreams of one type, in arrival
/// order. Finishes when every upstream has finished; the first failure
/// wins.
#[derive(Clone)]
pub struct Merge<U> {
  upstreams: U,
}

impl<U> Merge<U> {
  pub fn new(upstreams: U) -> Self { Merge { upstreams } }
}

/// [`Merge`] over any number of upstreams of the same publisher type.
#[derive(Clone)]
pub struct MergeMany<P> {
  upstreams: Vec<P>,
}

impl<P> MergeMany<P> {
  pub fn new(upstreams: impl IntoIterator<Item = P>) -> Self {
    MergeMany { upstreams: upstreams.into_iter().collect() }
  }
}

struct Interleave<T> {
  queue: VecDeque<T>,
}

impl<T: Send + 'static> Gather for Interleave<T> {
  type Output = T;

  fn put(&mut self, _: usize, value: Boxed) { self.queue.push_back(unbox(value)); }

  fn take(&mut self) -> Option<T> { self.queue.pop_front() }

  fn has_ready(&self) -> bool { !self.queue.is_empty() }

  fn is_exhausted(&self, finished: &[bool]) -> bool { finished.iter().all(|f| *f) }

  fn clear(&mut self) { self.queue.clear(); }
}

fn interleave<T>() -> Interleave<T> { Interleave { queue: VecDeque::new() } }

macro_rules! impl_merge {
  ($n: expr; $($P: ident $idx: tt),+) => {
    impl<T, E, $($P),+> Publisher for Merge<($($P,)+)>
    where
      T: Send + 'static,
      E: Send + 'static,
      $($P: Publisher<Output = T, Failure = E>,)+
    {
      type Output = T;
      type Failure = E;

      fn subscribe<S>(&self, subscriber: S)
      where
        S: Subscriber<Input = T, Failure = E>,
      {
        let aggregate = Aggregate::new(interleave(), $n, subscriber);
        $(self.upstreams.$idx.subscribe(Slot::<T, _, _>::new($idx, &aggregate));)+
        aggregate.attached();
      }
    }
  };
}

impl_merge!(2; P0 0, P1 1);
impl_merge!(3; P0 0, P1 1, P2 2);
impl_merge!(4; P0 0, P1 1, P2 2, P3 3);

impl<P: Publisher> Publisher for MergeMany<P> {
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = P::Failure>,
  {
    let aggregate = Aggregate::new(interleave(), self.upstreams.len(), subscriber);
    for (index, upstream) in self.upstreams.iter().enumerate() {
      upstream.subscribe(Slot::<P::Output, _, _>::new(index, &aggregate));
    }
    aggregate.attached();
  }
}
