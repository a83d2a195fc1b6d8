//! Operators that only touch the failure side of a stream.

use std::{fmt::Debug, marker::PhantomData, panic::Location, sync::Arc};

use crate::{
  channel::AnonymousChannel,
  completion::Completion,
  publisher::Publisher,
  subscriber::Subscriber,
  Never,
};

/// Converts the upstream failure with a closure.
pub struct MapError<P, F> {
  upstream: P,
  transform: Arc<F>,
}

/// Gives a never-failing upstream any failure type, so it can be combined
/// with fallible publishers.
pub struct SetFailureType<P, E> {
  upstream: P,
  _marker: PhantomData<fn() -> E>,
}

/// Turns an upstream failure into a panic carrying the caller's location.
pub struct AssertNoFailure<P> {
  upstream: P,
  location: &'static Location<'static>,
}

impl<P, F> MapError<P, F> {
  pub(crate) fn new(upstream: P, transform: F) -> Self { MapError { upstream, transform: Arc::new(transform) } }
}

impl<P, E> SetFailureType<P, E> {
  pub(crate) fn new(upstream: P) -> Self { SetFailureType { upstream, _marker: PhantomData } }
}

impl<P> AssertNoFailure<P> {
  #[track_caller]
  pub(crate) fn new(upstream: P) -> Self { AssertNoFailure { upstream, location: Location::caller() } }
}

impl<P, F, E> Publisher for MapError<P, F>
where
  P: Publisher,
  F: Fn(P::Failure) -> E + Send + Sync + 'static,
  E: Send + 'static,
{
  type Output = P::Output;
  type Failure = E;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = E>,
  {
    let transform = self.transform.clone();
    let channel = AnonymousChannel::<P::Output, P::Failure, S>::builder(
      subscriber,
      |ch, value| ch.send(value),
      move |ch, completion| ch.finish(completion.map_failure(&*transform)),
    )
    .build();
    self.upstream.subscribe(channel);
  }
}

impl<P, E> Publisher for SetFailureType<P, E>
where
  P: Publisher<Failure = Never>,
  E: Send + 'static,
{
  type Output = P::Output;
  type Failure = E;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = E>,
  {
    let channel = AnonymousChannel::<P::Output, Never, S>::builder(
      subscriber,
      |ch, value| ch.send(value),
      |ch, completion| match completion {
        Completion::Finished => ch.finish(Completion::Finished),
        Completion::Failure(never) => match never {},
      },
    )
    .build();
    self.upstream.subscribe(channel);
  }
}

impl<P> Publisher for AssertNoFailure<P>
where
  P: Publisher,
  P::Failure: Debug,
{
  type Output = P::Output;
  type Failure = Never;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = Never>,
  {
    let location = self.location;
    let channel = AnonymousChannel::<P::Output, P::Failure, S>::builder(
      subscriber,
      |ch, value| ch.send(value),
      move |ch, completion| match completion {
        Completion::Finished => ch.finish(Completion::Finished),
        Completion::Failure(e) => panic!("unexpected failure at {location}: {e:?}"),
      },
    )
    .build();
    self.upstream.subscribe(channel);
  }
}

#[cfg(test)]
mod tests {
  use crate::{
    prelude::*,
    test_util::{Manual, Recorder},
  };

  #[derive(Debug, Clone, PartialEq, thiserror::Error)]
  enum Wrapped {
    #[error("upstream said {0}")]
    Upstream(&'static str),
  }

  #[test]
  fn map_error_converts_failure() {
    let upstream = Manual::<i32, &'static str>::new();
    let rec = Recorder::unlimited();
    upstream.clone().map_error(Wrapped::Upstream).subscribe(rec.clone());
    upstream.send(1);
    upstream.complete(Completion::Failure("boom"));
    assert_eq!(rec.values(), vec![1]);
    assert_eq!(rec.completions(), vec![Completion::Failure(Wrapped::Upstream("boom"))]);
    assert_eq!(
      rec.completions()[0].as_ref().failure().map(|e| e.to_string()),
      Some("upstream said boom".to_string())
    );
  }

  #[test]
  fn set_failure_type_passes_through() {
    let rec = Recorder::<i32, String>::unlimited();
    publisher::from_iter(0..2).set_failure_type::<String>().subscribe(rec.clone());
    assert_eq!(rec.values(), vec![0, 1]);
    assert_eq!(rec.completions(), vec![Completion::Finished]);
  }

  #[test]
  #[should_panic(expected = "unexpected failure")]
  fn assert_no_failure_panics() {
    let rec = Recorder::<i32, Never>::unlimited();
    publisher::fail::<i32, _>("nope").assert_no_failure().subscribe(rec);
  }
}
