use crate::{
  channel::AnonymousChannel,
  demand::Demand,
  publisher::Publisher,
  scheduler::Scheduler,
  subscriber::Subscriber,
};

/// Delivers values and the completion from tasks on `scheduler`, in the
/// order the upstream produced them. Subscription and requests are not
/// moved.
#[derive(Clone)]
pub struct ReceiveOn<P, SD> {
  upstream: P,
  scheduler: SD,
}

impl<P, SD> ReceiveOn<P, SD> {
  pub(crate) fn new(upstream: P, scheduler: SD) -> Self { ReceiveOn { upstream, scheduler } }
}

impl<P: Publisher, SD: Scheduler> Publisher for ReceiveOn<P, SD> {
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = P::Failure>,
  {
    let (on_value, on_completion) = (self.scheduler.clone(), self.scheduler.clone());
    let channel = AnonymousChannel::<P::Output, P::Failure, S>::builder(
      subscriber,
      move |ch, value| {
        // Queued now so the order survives a scheduler that runs tasks in
        // parallel.
        if ch.push(value) {
          if let Some(ch) = ch.arc() {
            on_value.schedule(move || ch.flush());
          }
        }
        Demand::NONE
      },
      move |ch, completion| {
        if ch.push_completion(completion) {
          if let Some(ch) = ch.arc() {
            on_completion.schedule(move || ch.flush());
          }
        }
      },
    )
    .build();
    self.upstream.subscribe(channel);
  }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, test_util::Recorder};

  #[test]
  fn delivers_on_scheduler_tasks() {
    let scheduler = TestScheduler::new();
    let rec = Recorder::unlimited();
    publisher::from_iter(vec![1, 2, 3]).receive_on(scheduler.clone()).subscribe(rec.clone());
    assert_eq!(rec.subscriptions(), 1);
    assert!(rec.values().is_empty());
    assert_eq!(scheduler.pending_count(), 4);

    scheduler.run();
    assert_eq!(rec.values(), vec![1, 2, 3]);
    assert_eq!(rec.completions(), vec![Completion::Finished]);
  }

  #[test]
  fn demand_still_bounds_the_upstream() {
    let scheduler = TestScheduler::new();
    let rec = Recorder::with_demand(Demand::max(1), Demand::max(1));
    publisher::from_iter(vec![1, 2, 3]).receive_on(scheduler.clone()).subscribe(rec.clone());
    assert_eq!(scheduler.pending_count(), 1);
    scheduler.run();
    assert_eq!(rec.values(), vec![1, 2, 3]);
    assert_eq!(rec.completions(), vec![Completion::<Never>::Finished]);
  }
}
