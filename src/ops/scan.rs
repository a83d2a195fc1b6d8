use std::{marker::PhantomData, sync::Arc};

use crate::{
  channel::{Step, Transform, TransformChannel},
  publisher::Publisher,
  subscriber::Subscriber,
};

/// Emits every intermediate result of folding the values into an
/// accumulator.
///
/// ```rust
/// use traffic::prelude::*;
///
/// let sums = MutArc::own(vec![]);
/// let c_sums = sums.clone();
/// let _c = publisher::from_iter(1..=4)
///   .scan(0, |acc, v| acc + v)
///   .sink_value(move |v| c_sums.rc_deref_mut().push(v));
/// assert_eq!(sums.get(), vec![1, 3, 6, 10]);
/// ```
pub struct Scan<P, T, F> {
  upstream: P,
  initial: T,
  accumulate: Arc<F>,
}

/// Like [`Scan`], but a closure error fails the stream.
pub struct TryScan<P, T, F> {
  upstream: P,
  initial: T,
  accumulate: Arc<F>,
}

impl<P, T, F> Scan<P, T, F> {
  pub(crate) fn new(upstream: P, initial: T, accumulate: F) -> Self {
    Scan { upstream, initial, accumulate: Arc::new(accumulate) }
  }
}

impl<P, T, F> TryScan<P, T, F> {
  pub(crate) fn new(upstream: P, initial: T, accumulate: F) -> Self {
    TryScan { upstream, initial, accumulate: Arc::new(accumulate) }
  }
}

struct ScanLogic<F, I, T, E> {
  acc: T,
  accumulate: Arc<F>,
  _marker: PhantomData<fn(I) -> E>,
}

impl<F, I, T, E> Transform for ScanLogic<F, I, T, E>
where
  F: Fn(T, I) -> Result<T, E> + Send + Sync + 'static,
  I: Send + 'static,
  T: Clone + Send + 'static,
  E: Send + 'static,
{
  type Input = I;
  type Output = T;
  type Failure = E;

  fn transform(&mut self, input: I) -> Result<Step<T>, E> {
    let next = (self.accumulate)(self.acc.clone(), input)?;
    self.acc = next.clone();
    Ok(Step::Emit(next))
  }
}

impl<P, T, F> Publisher for Scan<P, T, F>
where
  P: Publisher,
  T: Clone + Send + Sync + 'static,
  F: Fn(T, P::Output) -> T + Send + Sync + 'static,
{
  type Output = T;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = T, Failure = P::Failure>,
  {
    let accumulate = self.accumulate.clone();
    let logic = ScanLogic {
      acc: self.initial.clone(),
      accumulate: Arc::new(move |acc: T, v: P::Output| -> Result<T, P::Failure> { Ok(accumulate(acc, v)) }),
      _marker: PhantomData,
    };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}

impl<P, T, F> Publisher for TryScan<P, T, F>
where
  P: Publisher,
  T: Clone + Send + Sync + 'static,
  F: Fn(T, P::Output) -> Result<T, P::Failure> + Send + Sync + 'static,
{
  type Output = T;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = T, Failure = P::Failure>,
  {
    let logic = ScanLogic {
      acc: self.initial.clone(),
      accumulate: self.accumulate.clone(),
      _marker: PhantomData,
    };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, test_util::Recorder};

  #[test]
  fn running_sum() {
    let rec = Recorder::<i32, Never>::unlimited();
    publisher::from_iter(vec![1, 1, 1]).scan(10, |acc, v| acc + v).subscribe(rec.clone());
    assert_eq!(rec.values(), vec![11, 12, 13]);
  }

  #[test]
  fn each_subscription_starts_fresh() {
    let scanned = publisher::from_iter(vec![1, 2]).scan(0, |acc, v| acc + v);
    let a = Recorder::<i32, Never>::unlimited();
    let b = Recorder::<i32, Never>::unlimited();
    scanned.subscribe(a.clone());
    scanned.subscribe(b.clone());
    assert_eq!(a.values(), vec![1, 3]);
    assert_eq!(b.values(), vec![1, 3]);
  }

  #[test]
  fn try_scan_stops_on_error() {
    let rec = Recorder::<i32, &'static str>::unlimited();
    publisher::from_iter(vec![5, 5, 5])
      .set_failure_type::<&'static str>()
      .try_scan(0, |acc, v| if acc + v > 10 { Err("overflow") } else { Ok(acc + v) })
      .subscribe(rec.clone());
    assert_eq!(rec.values(), vec![5, 10]);
    assert_eq!(rec.completions(), vec![Completion::Failure("overflow")]);
  }
}
