use std::{
  marker::PhantomData,
  ops::{Bound, RangeBounds},
};

use crate::{
  channel::{Step, Transform, TransformChannel},
  publisher::Publisher,
  subscriber::Subscriber,
};

/// Republishes the values whose position falls in a range, then finishes
/// and cancels the upstream once the range is exhausted.
///
/// `prefix(n)` is `output_in(..n)`, `drop_first(n)` is `output_in(n..)` and
/// `output_at(i)` is `output_in(i..=i)`.
///
/// ```rust
/// use traffic::prelude::*;
///
/// let seen = MutArc::own(vec![]);
/// let c_seen = seen.clone();
/// let _c = publisher::from_iter(0..10)
///   .output_in(2..5)
///   .sink_value(move |v| c_seen.rc_deref_mut().push(v));
/// assert_eq!(seen.get(), vec![2, 3, 4]);
/// ```
pub struct OutputRange<P> {
  upstream: P,
  start: usize,
  /// Exclusive.
  end: Option<usize>,
}

impl<P> OutputRange<P> {
  pub(crate) fn new(upstream: P, range: impl RangeBounds<usize>) -> Self {
    let start = match range.start_bound() {
      Bound::Included(s) => *s,
      Bound::Excluded(s) => s.saturating_add(1),
      Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
      Bound::Included(e) => Some(e.saturating_add(1)),
      Bound::Excluded(e) => Some(*e),
      Bound::Unbounded => None,
    };
    OutputRange { upstream, start, end }
  }
}

struct OutputLogic<I, E> {
  index: usize,
  start: usize,
  end: Option<usize>,
  _marker: PhantomData<fn(I) -> E>,
}

impl<I: Send + 'static, E: Send + 'static> Transform for OutputLogic<I, E> {
  type Input = I;
  type Output = I;
  type Failure = E;

  fn transform(&mut self, input: I) -> Result<Step<I>, E> {
    let index = self.index;
    self.index = self.index.saturating_add(1);
    Ok(match self.end {
      Some(end) if index >= end => Step::Finish,
      _ if index < self.start => Step::Replenish,
      Some(end) if index + 1 == end => Step::EmitAndFinish(input),
      _ => Step::Emit(input),
    })
  }
}

impl<P: Publisher> Publisher for OutputRange<P> {
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = P::Failure>,
  {
    let logic = OutputLogic { index: 0, start: self.start, end: self.end, _marker: PhantomData };
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
  fn prefix_finishes_and_cancels() {
    let upstream = Manual::<i32, Never>::new();
    let rec = Recorder::unlimited();
    upstream.clone().prefix(2).subscribe(rec.clone());
    upstream.send(1);
    upstream.send(2);
    upstream.send(3);
    assert_eq!(rec.values(), vec![1, 2]);
    assert_eq!(rec.completions(), vec![Completion::Finished]);
    assert_eq!(upstream.cancels(), 1);
  }

  #[test]
  fn drop_first_replenishes_demand() {
    let upstream = Manual::<i32, Never>::new();
    let rec = Recorder::with_demand(Demand::max(1), Demand::NONE);
    upstream.clone().drop_first(2).subscribe(rec.clone());
    assert_eq!(upstream.send(1), Demand::max(1));
    assert_eq!(upstream.send(2), Demand::max(1));
    assert_eq!(upstream.send(3), Demand::NONE);
    assert_eq!(rec.values(), vec![3]);
  }

  #[test]
  fn output_at() {
    let rec = Recorder::<char, Never>::unlimited();
    publisher::from_iter("abcdef".chars()).output_at(3).subscribe(rec.clone());
    assert_eq!(rec.values(), vec!['d']);
    assert_eq!(rec.completions(), vec![Completion::Finished]);
  }

  #[test]
  fn range_past_the_end() {
    let rec = Recorder::<i32, Never>::unlimited();
    publisher::from_iter(0..3).output_in(1..10).subscribe(rec.clone());
    assert_eq!(rec.values(), vec![1, 2]);
    assert_eq!(rec.completions(), vec![Completion::Finished]);
  }
}
