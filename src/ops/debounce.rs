use std::time::Duration;

use tracing::trace;

use crate::{
  channel::AnonymousChannel,
  completion::Completion,
  demand::Demand,
  publisher::Publisher,
  rc::MutArc,
  scheduler::{Scheduler, SchedulerTime},
  subscriber::Subscriber,
};

/// Publishes a value only once `due_time` has passed without a newer one.
///
/// The upstream is asked for everything up front; a value whose quiet
/// period ends while the downstream has no demand is dropped. Completion is
/// forwarded at once and discards the value still waiting.
#[derive(Clone)]
pub struct Debounce<P, SD> {
  upstream: P,
  due_time: Duration,
  scheduler: SD,
}

impl<P, SD> Debounce<P, SD> {
  pub(crate) fn new(upstream: P, due_time: Duration, scheduler: SD) -> Self {
    Debounce { upstream, due_time, scheduler }
  }
}

struct Quiet<T> {
  generation: u64,
  pending: Option<T>,
}

impl<T> Quiet<T> {
  fn reset(&mut self) {
    self.generation = self.generation.wrapping_add(1);
    self.pending = None;
  }
}

impl<P: Publisher, SD: Scheduler> Publisher for Debounce<P, SD> {
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = P::Failure>,
  {
    let quiet = MutArc::own(Quiet { generation: 0, pending: None });
    let (on_value, on_completion, on_cancel) = (quiet.clone(), quiet.clone(), quiet);
    let scheduler = self.scheduler.clone();
    let due_time = self.due_time;

    let channel = AnonymousChannel::<P::Output, P::Failure, S>::builder(
      subscriber,
      move |ch, value| {
        let generation = {
          let mut quiet = on_value.rc_deref_mut();
          quiet.generation = quiet.generation.wrapping_add(1);
          quiet.pending = Some(value);
          quiet.generation
        };
        if let Some(ch) = ch.arc() {
          let quiet = on_value.clone();
          let due = scheduler.now().advanced(due_time);
          scheduler.schedule_after(due, scheduler.minimum_tolerance(), move || {
            let value = {
              let mut quiet = quiet.rc_deref_mut();
              if quiet.generation != generation {
                return;
              }
              quiet.pending.take()
            };
            match value {
              Some(value) if ch.demand() > Demand::NONE => ch.enqueue(value),
              Some(_) => trace!("debounce: value dropped without demand"),
              None => {}
            }
          });
        }
        Demand::NONE
      },
      move |ch, completion: Completion<P::Failure>| {
        on_completion.rc_deref_mut().reset();
        ch.enqueue_completion(completion);
      },
    )
    .on_subscription(|ch, subscription| {
      ch.forward_subscription();
      subscription.request(Demand::UNLIMITED);
    })
    .on_request(|ch, demand| ch.add_demand(demand))
    .on_cancel(move |_| on_cancel.rc_deref_mut().reset())
    .build();
    self.upstream.subscribe(channel);
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use crate::{prelude::*, test_util::Recorder};

  fn ms(n: u64) -> Duration { Duration::from_millis(n) }

  #[test]
  fn waits_for_a_pause() {
    let scheduler = TestScheduler::new();
    let subject = PassthroughSubject::<i32, Never>::new();
    let rec = Recorder::unlimited();
    subject.clone().debounce(ms(10), scheduler.clone()).subscribe(rec.clone());

    subject.send(1);
    scheduler.advance_by(ms(5));
    subject.send(2);
    scheduler.advance_by(ms(9));
    assert!(rec.values().is_empty());
    scheduler.advance_by(ms(1));
    assert_eq!(rec.values(), vec![2]);

    subject.send(3);
    scheduler.advance_by(ms(20));
    assert_eq!(rec.values(), vec![2, 3]);
  }

  #[test]
  fn completion_discards_the_waiting_value() {
    let scheduler = TestScheduler::new();
    let subject = PassthroughSubject::<i32, Never>::new();
    let rec = Recorder::unlimited();
    subject.clone().debounce(ms(10), scheduler.clone()).subscribe(rec.clone());

    subject.send(1);
    subject.send_completion(Completion::Finished);
    scheduler.run();
    assert!(rec.values().is_empty());
    assert_eq!(rec.completions(), vec![Completion::Finished]);
  }

  #[test]
  fn drops_without_demand() {
    let scheduler = TestScheduler::new();
    let subject = PassthroughSubject::<i32, Never>::new();
    let rec = Recorder::with_demand(Demand::max(1), Demand::NONE);
    subject.clone().debounce(ms(1), scheduler.clone()).subscribe(rec.clone());

    subject.send(1);
    scheduler.advance_by(ms(1));
    subject.send(2);
    scheduler.advance_by(ms(1));
    rec.request(Demand::max(1));
    subject.send(3);
    scheduler.advance_by(ms(1));
    assert_eq!(rec.values(), vec![1, 3]);
  }
}
