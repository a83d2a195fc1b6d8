use std::sync::Arc;

use tracing::debug;

use crate::{
  channel::AnonymousChannel,
  completion::Completion,
  publisher::Publisher,
  rc::MutArc,
  subscriber::Subscriber,
};

/// Re-subscribes to the upstream after a failure, up to `attempts` times.
///
/// The replacement subscription is asked for whatever the downstream had
/// requested and not yet received. Once the attempts are used up the last
/// failure is forwarded.
pub struct Retry<P> {
  upstream: Arc<P>,
  attempts: usize,
}

impl<P> Retry<P> {
  pub(crate) fn new(upstream: P, attempts: usize) -> Self { Retry { upstream: Arc::new(upstream), attempts } }
}

impl<P> Publisher for Retry<P>
where
  P: Publisher + Send + Sync + 'static,
{
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = P::Failure>,
  {
    let upstream = self.upstream.clone();
    let remaining = MutArc::own(self.attempts);
    let channel = AnonymousChannel::<P::Output, P::Failure, S>::builder(
      subscriber,
      |ch, value| ch.send(value),
      move |ch, completion| {
        if completion.is_failure() {
          let again = {
            let mut remaining = remaining.rc_deref_mut();
            let again = *remaining > 0;
            *remaining = remaining.saturating_sub(1);
            again
          };
          if again && ch.detach_upstream() {
            if let Some(me) = ch.arc() {
              debug!(left = *remaining.rc_deref_mut(), "retry: re-subscribing after failure");
              upstream.subscribe(me);
              return;
            }
          }
        }
        ch.finish(completion)
      },
    )
    .build();
    self.upstream.subscribe(channel);
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use crate::{prelude::*, test_util::Recorder};

  #[test]
  fn retries_then_gives_up() {
    let attempts = std::sync::Arc::new(AtomicUsize::new(0));
    let c_attempts = attempts.clone();
    let flaky = publisher::from_iter(1..=2)
      .set_failure_type::<&'static str>()
      .append(publisher::fail("flaky"))
      .handle_events()
      .on_subscription(move |_| {
        c_attempts.fetch_add(1, Ordering::SeqCst);
      });

    let rec = Recorder::<i32, &'static str>::unlimited();
    flaky.retry(2).subscribe(rec.clone());
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(rec.values(), vec![1, 2, 1, 2, 1, 2]);
    assert_eq!(rec.completions(), vec![Completion::Failure("flaky")]);
    assert_eq!(rec.subscriptions(), 1);
  }

  #[test]
  fn outstanding_demand_is_replayed() {
    let failing = publisher::from_iter(0..5).set_failure_type::<()>().try_map(|v| if v == 1 { Err(()) } else { Ok(v) });
    let rec = Recorder::<i32, ()>::with_demand(Demand::max(3), Demand::NONE);
    failing.retry(1).subscribe(rec.clone());
    // 0, failure, retry: 0, failure, forwarded.
    assert_eq!(rec.values(), vec![0, 0]);
    assert_eq!(rec.completions(), vec![Completion::Failure(())]);
  }
}
