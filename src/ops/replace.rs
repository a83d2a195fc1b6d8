//! Operators that substitute a final value for an empty or failed upstream.
//!
//! The substitute is held until the downstream has demand for it.

use crate::{
  channel::AnonymousChannel,
  completion::Completion,
  demand::Demand,
  publisher::Publisher,
  rc::MutArc,
  subscriber::Subscriber,
  Never,
};

/// Emits `value` if the upstream finishes without producing anything.
pub struct ReplaceEmpty<P, T> {
  upstream: P,
  value: T,
}

/// Replaces an upstream failure with `value` followed by a normal finish.
pub struct ReplaceError<P, T> {
  upstream: P,
  value: T,
}

impl<P, T> ReplaceEmpty<P, T> {
  pub(crate) fn new(upstream: P, value: T) -> Self { ReplaceEmpty { upstream, value } }
}

impl<P, T> ReplaceError<P, T> {
  pub(crate) fn new(upstream: P, value: T) -> Self { ReplaceError { upstream, value } }
}

/// Sends `value` and finishes, or parks it in `held` until demand arrives.
fn emit_final<I, E, D>(ch: &AnonymousChannel<I, E, D>, held: &MutArc<Option<D::Input>>, value: D::Input)
where
  I: Send + 'static,
  E: Send + 'static,
  D: Subscriber,
{
  let ready = {
    let mut held = held.rc_deref_mut();
    if ch.demand() > Demand::NONE {
      Some(value)
    } else {
      *held = Some(value);
      None
    }
  };
  if let Some(value) = ready {
    ch.send(value);
    ch.finish(Completion::Finished);
  }
}

fn release<I, E, D>(ch: &AnonymousChannel<I, E, D>, held: &MutArc<Option<D::Input>>, demand: Demand)
where
  I: Send + 'static,
  E: Send + 'static,
  D: Subscriber,
{
  ch.forward_request(demand);
  let parked = held.rc_deref_mut().take();
  if let Some(value) = parked {
    ch.send(value);
    ch.finish(Completion::Finished);
  }
}

impl<P, T> Publisher for ReplaceEmpty<P, T>
where
  P: Publisher<Output = T>,
  T: Clone + Send + Sync + 'static,
{
  type Output = T;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = T, Failure = P::Failure>,
  {
    let replacement = self.value.clone();
    let seen = MutArc::own(false);
    let c_seen = seen.clone();
    let held = MutArc::own(None);
    let c_held = held.clone();
    let channel = AnonymousChannel::<T, P::Failure, S>::builder(
      subscriber,
      move |ch, value| {
        *c_seen.rc_deref_mut() = true;
        ch.send(value)
      },
      move |ch, completion| {
        let empty = !*seen.rc_deref_mut();
        match completion {
          Completion::Finished if empty => emit_final(ch, &held, replacement.clone()),
          other => ch.finish(other),
        }
      },
    )
    .on_request(move |ch, demand| release(ch, &c_held, demand))
    .build();
    self.upstream.subscribe(channel);
  }
}

impl<P, T> Publisher for ReplaceError<P, T>
where
  P: Publisher<Output = T>,
  T: Clone + Send + Sync + 'static,
{
  type Output = T;
  type Failure = Never;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = T, Failure = Never>,
  {
    let replacement = self.value.clone();
    let held = MutArc::own(None);
    let c_held = held.clone();
    let channel = AnonymousChannel::<T, P::Failure, S>::builder(
      subscriber,
      |ch, value| ch.send(value),
      move |ch, completion| match completion {
        Completion::Finished => ch.finish(Completion::Finished),
        Completion::Failure(_) => emit_final(ch, &held, replacement.clone()),
      },
    )
    .on_request(move |ch, demand| release(ch, &c_held, demand))
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

  #[test]
  fn replace_empty_only_when_empty() {
    let rec = Recorder::<i32, Never>::unlimited();
    publisher::empty::<i32, Never>().replace_empty(9).subscribe(rec.clone());
    assert_eq!(rec.values(), vec![9]);
    assert_eq!(rec.completions(), vec![Completion::Finished]);

    let rec = Recorder::<i32, Never>::unlimited();
    publisher::just(1).replace_empty(9).subscribe(rec.clone());
    assert_eq!(rec.values(), vec![1]);
  }

  #[test]
  fn replace_error_waits_for_demand() {
    let upstream = Manual::<i32, &'static str>::new();
    let rec = Recorder::with_demand(Demand::max(1), Demand::NONE);
    upstream.clone().replace_error(-1).subscribe(rec.clone());

    upstream.send(1);
    upstream.complete(Completion::Failure("bad"));
    assert_eq!(rec.values(), vec![1]);
    assert!(rec.completions().is_empty());

    rec.request(Demand::max(1));
    assert_eq!(rec.values(), vec![1, -1]);
    assert_eq!(rec.completions(), vec![Completion::Finished]);
  }
}
