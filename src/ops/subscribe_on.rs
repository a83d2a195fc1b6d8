use std::sync::Arc;

use crate::{channel::AnonymousChannel, publisher::Publisher, scheduler::Scheduler, subscriber::Subscriber};

/// Performs the subscription to the upstream, and every later request,
/// from tasks on `scheduler`. Values are delivered wherever the upstream
/// produces them.
pub struct SubscribeOn<P, SD> {
  upstream: Arc<P>,
  scheduler: SD,
}

impl<P, SD> SubscribeOn<P, SD> {
  pub(crate) fn new(upstream: P, scheduler: SD) -> Self { SubscribeOn { upstream: Arc::new(upstream), scheduler } }
}

impl<P, SD: Clone> Clone for SubscribeOn<P, SD> {
  fn clone(&self) -> Self { SubscribeOn { upstream: self.upstream.clone(), scheduler: self.scheduler.clone() } }
}

impl<P, SD> Publisher for SubscribeOn<P, SD>
where
  P: Publisher + Send + Sync + 'static,
  SD: Scheduler,
{
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = P::Failure>,
  {
    let scheduler = self.scheduler.clone();
    let channel = AnonymousChannel::<P::Output, P::Failure, S>::builder(
      subscriber,
      |ch, value| ch.send(value),
      |ch, completion| ch.finish(completion),
    )
    .on_request(move |ch, demand| {
      if let Some(ch) = ch.arc() {
        scheduler.schedule(move || ch.forward_request(demand));
      }
    })
    .build();
    let upstream = self.upstream.clone();
    self.scheduler.schedule(move || upstream.subscribe(channel));
  }
}

#[cfg(test)]
mod tests {
  use crate::{
    prelude::*,
    test_util::{Manual, Recorder},
  };

  #[test]
  fn subscribes_and_requests_on_scheduler() {
    let scheduler = TestScheduler::new();
    let rec = Recorder::unlimited();
    publisher::from_iter(vec![1, 2]).subscribe_on(scheduler.clone()).subscribe(rec.clone());
    assert_eq!(rec.subscriptions(), 0);

    assert_eq!(scheduler.pending_count(), 1);

    scheduler.run();
    assert_eq!(rec.subscriptions(), 1);
    assert_eq!(rec.values(), vec![1, 2]);
    assert_eq!(rec.completions(), vec![Completion::<Never>::Finished]);
  }

  #[test]
  fn later_requests_hop_onto_scheduler() {
    let scheduler = TestScheduler::new();
    let upstream = Manual::<i32, ()>::new();
    let rec = Recorder::with_demand(Demand::max(1), Demand::NONE);
    upstream.clone().subscribe_on(scheduler.clone()).subscribe(rec.clone());
    scheduler.run();
    assert_eq!(upstream.requests(), vec![Demand::max(1)]);

    rec.request(Demand::max(2));
    assert_eq!(upstream.requests().len(), 1);
    assert_eq!(scheduler.pending_count(), 1);
    scheduler.run();
    assert_eq!(upstream.requests(), vec![Demand::max(1), Demand::max(2)]);
  }
}
