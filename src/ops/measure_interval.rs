use std::time::Duration;

use crate::{
  channel::AnonymousChannel,
  demand::Demand,
  publisher::Publisher,
  rc::MutArc,
  scheduler::{Scheduler, SchedulerTime},
  subscriber::Subscriber,
};

/// Replaces every value with the time elapsed since the previous one, or
/// since the subscription for the first value, as measured by `scheduler`.
#[derive(Clone)]
pub struct MeasureInterval<P, SD> {
  upstream: P,
  scheduler: SD,
}

impl<P, SD> MeasureInterval<P, SD> {
  pub(crate) fn new(upstream: P, scheduler: SD) -> Self { MeasureInterval { upstream, scheduler } }
}

impl<P: Publisher, SD: Scheduler> Publisher for MeasureInterval<P, SD> {
  type Output = Duration;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = Duration, Failure = P::Failure>,
  {
    let last = MutArc::own(self.scheduler.now());
    let c_last = last.clone();
    let (scheduler, c_scheduler) = (self.scheduler.clone(), self.scheduler.clone());
    let channel = AnonymousChannel::<P::Output, P::Failure, S>::builder(
      subscriber,
      move |ch, _| {
        let now = scheduler.now();
        let elapsed = {
          let mut last = last.rc_deref_mut();
          let elapsed = last.distance_to(now);
          *last = now;
          elapsed
        };
        ch.send(elapsed)
      },
      |ch, completion| ch.finish(completion),
    )
    .on_subscription(move |ch, _| {
      *c_last.rc_deref_mut() = c_scheduler.now();
      ch.forward_subscription();
    })
    .build();
    self.upstream.subscribe(channel);
  }
}
