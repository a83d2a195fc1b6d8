use std::time::Duration;

use crate::{
  channel::AnonymousChannel,
  demand::Demand,
  publisher::Publisher,
  scheduler::{Scheduler, SchedulerTime},
  subscriber::Subscriber,
};

/// Shifts every value and the completion `interval` into the future on
/// `scheduler`. The subscription itself is not delayed.
#[derive(Clone)]
pub struct Delay<P, SD> {
  upstream: P,
  interval: Duration,
  tolerance: Duration,
  scheduler: SD,
}

impl<P, SD: Scheduler> Delay<P, SD> {
  pub(crate) fn new(upstream: P, interval: Duration, scheduler: SD) -> Self {
    let tolerance = scheduler.minimum_tolerance();
    Delay { upstream, interval, tolerance, scheduler }
  }

  /// Allows the scheduler to fire up to `tolerance` late.
  pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
    self.tolerance = tolerance.max(self.scheduler.minimum_tolerance());
    self
  }
}

impl<P: Publisher, SD: Scheduler> Publisher for Delay<P, SD> {
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = P::Failure>,
  {
    let Delay { interval, tolerance, .. } = *self;
    let on_value = self.scheduler.clone();
    let on_completion = self.scheduler.clone();
    let channel = AnonymousChannel::<P::Output, P::Failure, S>::builder(
      subscriber,
      move |ch, value| {
        if let Some(ch) = ch.arc() {
          let due = on_value.now().advanced(interval);
          on_value.schedule_after(due, tolerance, move || ch.enqueue(value));
        }
        Demand::NONE
      },
      move |ch, completion| {
        if let Some(ch) = ch.arc() {
          let due = on_completion.now().advanced(interval);
          on_completion.schedule_after(due, tolerance, move || ch.enqueue_completion(completion));
        }
      },
    )
    .build();
    self.upstream.subscribe(channel);
  }
}
