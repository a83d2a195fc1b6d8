use std::sync::Arc;

use crate::{
  channel::AnonymousChannel,
  completion::Completion,
  publisher::Publisher,
  rc::MutArc,
  subscriber::Subscriber,
};

/// Republishes `prefix` and, once it finishes, `suffix`.
///
/// `a.append(b)` and `b.prepend(a)` both build `Concatenate { a, b }`. The
/// suffix is subscribed only after the prefix finished normally, and is
/// asked for whatever demand the downstream still has outstanding.
pub struct Concatenate<P, Q> {
  prefix: P,
  suffix: Arc<Q>,
}

impl<P, Q> Concatenate<P, Q> {
  pub(crate) fn new(prefix: P, suffix: Q) -> Self { Concatenate { prefix, suffix: Arc::new(suffix) } }
}

impl<P, Q> Publisher for Concatenate<P, Q>
where
  P: Publisher,
  Q: Publisher<Output = P::Output, Failure = P::Failure> + Send + Sync + 'static,
{
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = P::Failure>,
  {
    let suffix = self.suffix.clone();
    let on_suffix = MutArc::own(false);
    let channel = AnonymousChannel::<P::Output, P::Failure, S>::builder(
      subscriber,
      |ch, value| ch.send(value),
      move |ch, completion| {
        let switch = completion.is_finished() && !std::mem::replace(&mut *on_suffix.rc_deref_mut(), true);
        if switch && ch.detach_upstream() {
          if let Some(me) = ch.arc() {
            suffix.subscribe(me);
          }
          return;
        }
        ch.finish(completion)
      },
    )
    .build();
    self.prefix.subscribe(channel);
  }
}

#[cfg(test)]
mod tests {
  use crate::{
    prelude::*,
    test_util::{Manual, Recorder},
  };

  #[test]
  fn append_and_prepend() {
    let rec = Recorder::<i32, Never>::unlimited();
    publisher::from_iter(vec![2, 3])
      .append(publisher::just(4))
      .prepend(publisher::just(1))
      .subscribe(rec.clone());
    assert_eq!(rec.values(), vec![1, 2, 3, 4]);
    assert_eq!(rec.completions(), vec![Completion::Finished]);
    assert_eq!(rec.subscriptions(), 1);
  }

  #[test]
  fn prefix_failure_skips_suffix() {
    let upstream = Manual::<i32, &'static str>::new();
    let rec = Recorder::unlimited();
    upstream.clone().append(publisher::fail("never reached")).subscribe(rec.clone());
    upstream.send(1);
    upstream.complete(Completion::Failure("prefix"));
    assert_eq!(rec.completions(), vec![Completion::Failure("prefix")]);
  }

  #[test]
  fn suffix_gets_remaining_demand() {
    let rec = Recorder::<i32, Never>::with_demand(Demand::max(3), Demand::NONE);
    publisher::from_iter(0..2).append(publisher::from_iter(10..)).subscribe(rec.clone());
    assert_eq!(rec.values(), vec![0, 1, 10]);
    assert!(rec.completions().is_empty());
  }
}
