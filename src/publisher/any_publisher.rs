use std::{fmt, sync::Arc};

use crate::{
  publisher::Publisher,
  subscriber::{AnySubscriber, Subscriber},
};

trait DynPublisher<T: Send + 'static, E: Send + 'static>: Send + Sync {
  fn subscribe_any(&self, subscriber: AnySubscriber<T, E>);
}

impl<P> DynPublisher<P::Output, P::Failure> for P
where
  P: Publisher + Send + Sync,
{
  fn subscribe_any(&self, subscriber: AnySubscriber<P::Output, P::Failure>) { self.subscribe(subscriber) }
}

/// A type-erased publisher.
///
/// Hides the concrete operator chain so pipelines can be returned from
/// functions or stored side by side. Clones share the wrapped publisher.
///
/// ```rust
/// use traffic::prelude::*;
///
/// fn evens(limit: u32) -> AnyPublisher<u32, Never> {
///   publisher::from_iter(0..limit).filter(|v| v % 2 == 0).erase_to_any_publisher()
/// }
///
/// let seen = MutArc::own(vec![]);
/// let c_seen = seen.clone();
/// let _c = evens(5).sink_value(move |v| c_seen.rc_deref_mut().push(v));
/// assert_eq!(seen.get(), vec![0, 2, 4]);
/// ```
pub struct AnyPublisher<T: Send + 'static, E: Send + 'static> {
  inner: Arc<dyn DynPublisher<T, E>>,
}

impl<T: Send + 'static, E: Send + 'static> AnyPublisher<T, E> {
  pub fn new<P>(publisher: P) -> Self
  where
    P: Publisher<Output = T, Failure = E> + Send + Sync + 'static,
  {
    AnyPublisher { inner: Arc::new(publisher) }
  }
}

impl<T: Send + 'static, E: Send + 'static> Clone for AnyPublisher<T, E> {
  fn clone(&self) -> Self { AnyPublisher { inner: self.inner.clone() } }
}

impl<T: Send + 'static, E: Send + 'static> fmt::Debug for AnyPublisher<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("AnyPublisher") }
}

impl<T: Send + 'static, E: Send + 'static> Publisher for AnyPublisher<T, E> {
  type Output = T;
  type Failure = E;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = T, Failure = E>,
  {
    self.inner.subscribe_any(AnySubscriber::new(subscriber))
  }

  fn erase_to_any_publisher(self) -> AnyPublisher<T, E> { self }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, test_util::Recorder};

  #[test]
  fn heterogeneous_pipelines_share_a_type() {
    let pipelines: Vec<AnyPublisher<i32, Never>> = vec![
      publisher::just(1).erase_to_any_publisher(),
      publisher::from_iter(2..4).map(|v| v * 10).erase_to_any_publisher(),
      publisher::empty().erase_to_any_publisher(),
    ];
    let rec = Recorder::<i32, Never>::unlimited();
    for p in &pipelines {
      p.subscribe(rec.clone());
    }
    assert_eq!(rec.values(), vec![1, 20, 30]);
    assert_eq!(rec.completions().len(), 3);
  }

  #[test]
  fn demand_passes_through_erasure() {
    let rec = Recorder::<i32, Never>::with_demand(Demand::max(1), Demand::NONE);
    publisher::from_iter(0..10).erase_to_any_publisher().erase_to_any_publisher().subscribe(rec.clone());
    assert_eq!(rec.values(), vec![0]);
  }
}
