use std::{sync::Arc, time::Duration};

use tracing::debug;

use crate::{
  channel::AnonymousChannel,
  completion::Completion,
  demand::Demand,
  publisher::Publisher,
  rc::MutArc,
  scheduler::{Scheduler, SchedulerTime},
  subscriber::Subscriber,
};

type MakeError<E> = Arc<dyn Fn() -> E + Send + Sync>;

/// Terminates the stream when the upstream stays silent for longer than
/// `interval`, measured from the subscription and from every value.
///
/// Without a custom error the stream simply finishes; with one it fails
/// with whatever the closure builds. Either way the upstream is cancelled.
pub struct Timeout<P: Publisher, SD> {
  upstream: P,
  interval: Duration,
  scheduler: SD,
  make_error: Option<MakeError<P::Failure>>,
}

impl<P: Publisher, SD> Timeout<P, SD> {
  pub(crate) fn new(upstream: P, interval: Duration, scheduler: SD) -> Self {
    Timeout { upstream, interval, scheduler, make_error: None }
  }

  /// Fails with `make_error()` instead of finishing when the timer fires.
  pub fn with_error<F>(mut self, make_error: F) -> Self
  where
    F: Fn() -> P::Failure + Send + Sync + 'static,
  {
    self.make_error = Some(Arc::new(make_error));
    self
  }
}

impl<P: Publisher + Clone, SD: Clone> Clone for Timeout<P, SD> {
  fn clone(&self) -> Self {
    Timeout {
      upstream: self.upstream.clone(),
      interval: self.interval,
      scheduler: self.scheduler.clone(),
      make_error: self.make_error.clone(),
    }
  }
}

struct Timer<SD, E> {
  generation: MutArc<u64>,
  scheduler: SD,
  interval: Duration,
  make_error: Option<MakeError<E>>,
}

impl<SD: Clone, E> Clone for Timer<SD, E> {
  fn clone(&self) -> Self {
    Timer {
      generation: self.generation.clone(),
      scheduler: self.scheduler.clone(),
      interval: self.interval,
      make_error: self.make_error.clone(),
    }
  }
}

impl<SD: Scheduler, E: Send + 'static> Timer<SD, E> {
  fn disarm(&self) -> u64 {
    let mut generation = self.generation.rc_deref_mut();
    *generation = generation.wrapping_add(1);
    *generation
  }

  /// Restarts the countdown.
  fn arm<I, D>(&self, ch: &AnonymousChannel<I, E, D>)
  where
    I: Send + 'static,
    D: Subscriber<Failure = E>,
  {
    let armed = self.disarm();
    let Some(ch) = ch.arc() else { return };
    let timer = self.clone();
    let due = self.scheduler.now().advanced(self.interval);
    self.scheduler.schedule_after(due, self.scheduler.minimum_tolerance(), move || {
      if *timer.generation.rc_deref_mut() != armed {
        return;
      }
      debug!(interval = ?timer.interval, "timeout: upstream stayed silent");
      let completion = match &timer.make_error {
        Some(make_error) => Completion::Failure(make_error()),
        None => Completion::Finished,
      };
      ch.enqueue_completion(completion);
    });
  }
}

impl<P: Publisher, SD: Scheduler> Publisher for Timeout<P, SD> {
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = P::Failure>,
  {
    let timer = Timer {
      generation: MutArc::own(0),
      scheduler: self.scheduler.clone(),
      interval: self.interval,
      make_error: self.make_error.clone(),
    };
    let (on_subscription, on_value, on_completion, on_cancel) =
      (timer.clone(), timer.clone(), timer.clone(), timer);

    let channel = AnonymousChannel::<P::Output, P::Failure, S>::builder(
      subscriber,
      move |ch, value| {
        on_value.arm(ch);
        ch.enqueue(value);
        Demand::NONE
      },
      move |ch, completion| {
        on_completion.disarm();
        ch.enqueue_completion(completion);
      },
    )
    .on_subscription(move |ch, _| {
      on_subscription.arm(ch);
      ch.forward_subscription();
    })
    .on_cancel(move |_| {
      on_cancel.disarm();
    })
    .build();
    self.upstream.subscribe(channel);
  }
}
