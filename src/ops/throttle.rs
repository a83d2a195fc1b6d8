use std::{sync::Arc, time::Duration};

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

/// Emits at most one value per `interval`.
///
/// The first value opens a window and goes out at once. Values arriving
/// while the window is open are reduced to one, the first or the most
/// recent depending on `latest`, which is published when the window
/// closes and opens the next one. The upstream is asked for everything up
/// front; values without downstream demand are dropped.
#[derive(Clone)]
pub struct Throttle<P, SD> {
  upstream: P,
  interval: Duration,
  scheduler: SD,
  latest: bool,
}

impl<P, SD> Throttle<P, SD> {
  pub(crate) fn new(upstream: P, interval: Duration, scheduler: SD, latest: bool) -> Self {
    Throttle { upstream, interval, scheduler, latest }
  }
}

struct Window<T> {
  open: bool,
  pending: Option<T>,
}

type Shared<T> = MutArc<Window<T>>;

fn emit<I, E, D>(ch: &AnonymousChannel<I, E, D>, value: D::Input)
where
  I: Send + 'static,
  E: Send + 'static,
  D: Subscriber,
{
  if ch.demand() > Demand::NONE {
    ch.enqueue(value);
  } else {
    trace!("throttle: value dropped without demand");
  }
}

fn close_later<I, E, D, SD>(ch: Arc<AnonymousChannel<I, E, D>>, window: Shared<I>, scheduler: SD, interval: Duration)
where
  I: Send + 'static,
  E: Send + 'static,
  D: Subscriber<Input = I>,
  SD: Scheduler,
{
  let due = scheduler.now().advanced(interval);
  let tolerance = scheduler.minimum_tolerance();
  let next = scheduler.clone();
  scheduler.schedule_after(due, tolerance, move || {
    let pending = {
      let mut window = window.rc_deref_mut();
      let pending = window.pending.take();
      window.open = pending.is_some();
      pending
    };
    if let Some(value) = pending {
      emit(&ch, value);
      close_later(ch, window, next, interval);
    }
  });
}

impl<P: Publisher, SD: Scheduler> Publisher for Throttle<P, SD> {
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = P::Failure>,
  {
    let window: Shared<P::Output> = MutArc::own(Window { open: false, pending: None });
    let (on_value, on_completion, on_cancel) = (window.clone(), window.clone(), window);
    let Throttle { interval, latest, .. } = *self;
    let scheduler = self.scheduler.clone();

    let channel = AnonymousChannel::<P::Output, P::Failure, S>::builder(
      subscriber,
      move |ch, value| {
        let now = {
          let mut window = on_value.rc_deref_mut();
          if window.open {
            if latest || window.pending.is_none() {
              window.pending = Some(value);
            }
            None
          } else {
            window.open = true;
            Some(value)
          }
        };
        if let Some(value) = now {
          emit(ch, value);
          if let Some(ch) = ch.arc() {
            close_later(ch, on_value.clone(), scheduler.clone(), interval);
          }
        }
        Demand::NONE
      },
      move |ch, completion: Completion<P::Failure>| {
        let pending = on_completion.rc_deref_mut().pending.take();
        if let (Some(value), true) = (pending, completion.is_finished()) {
          emit(ch, value);
        }
        ch.enqueue_completion(completion);
      },
    )
    .on_subscription(|ch, subscription| {
      ch.forward_subscription();
      subscription.request(Demand::UNLIMITED);
    })
    .on_request(|ch, demand| ch.add_demand(demand))
    .on_cancel(move |_| on_cancel.rc_deref_mut().pending = None)
    .build();
    self.upstream.subscribe(channel);
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use crate::{prelude::*, test_util::Recorder};

  fn ms(n: u64) -> Duration { Duration::from_millis(n) }

  fn drive(latest: bool) -> Vec<i32> {
    let scheduler = TestScheduler::new();
    let subject = PassthroughSubject::<i32, Never>::new();
    let rec = Recorder::unlimited();
    subject
      .clone()
      .throttle(ms(10), scheduler.clone(), latest)
      .subscribe(rec.clone());

    subject.send(1);
    subject.send(2);
    subject.send(3);
    scheduler.advance_by(ms(10));
    scheduler.advance_by(ms(10));
    subject.send(4);
    scheduler.run();
    rec.values()
  }

  #[test]
  fn latest_in_window() {
    assert_eq!(drive(true), vec![1, 3, 4]);
  }

  #[test]
  fn first_in_window() {
    assert_eq!(drive(false), vec![1, 2, 4]);
  }

  #[test]
  fn flushes_pending_on_finish() {
    let scheduler = TestScheduler::new();
    let subject = PassthroughSubject::<i32, Never>::new();
    let rec = Recorder::unlimited();
    subject.clone().throttle(ms(10), scheduler.clone(), true).subscribe(rec.clone());
    subject.send(1);
    subject.send(2);
    subject.send_completion(Completion::Finished);
    assert_eq!(rec.values(), vec![1, 2]);
    assert_eq!(rec.completions(), vec![Completion::Finished]);
  }
}
