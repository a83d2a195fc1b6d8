use std::time::{Duration, Instant};

use tokio::runtime::Handle;

use super::Scheduler;
use crate::subscription::AnyCancellable;

/// Spawns scheduled work onto a tokio runtime.
///
/// Timers use tokio's clock, so a runtime started with a paused clock
/// drives them deterministically.
#[derive(Clone, Debug)]
pub struct TokioScheduler {
  handle: Handle,
}

impl TokioScheduler {
  pub fn new(handle: Handle) -> Self { TokioScheduler { handle } }

  /// Uses the runtime the caller is running on.
  ///
  /// # Panics
  ///
  /// Outside of a tokio runtime.
  pub fn current() -> Self { TokioScheduler { handle: Handle::current() } }
}

impl Scheduler for TokioScheduler {
  type Time = Instant;

  fn now(&self) -> Instant { tokio::time::Instant::now().into_std() }

  fn minimum_tolerance(&self) -> Duration { Duration::from_millis(1) }

  fn schedule<F>(&self, task: F)
  where
    F: FnOnce() + Send + 'static,
  {
    self.handle.spawn(async move { task() });
  }

  fn schedule_after<F>(&self, due: Instant, _tolerance: Duration, task: F)
  where
    F: FnOnce() + Send + 'static,
  {
    let due = tokio::time::Instant::from_std(due);
    self.handle.spawn(async move {
      tokio::time::sleep_until(due).await;
      task()
    });
  }

  fn schedule_repeating<F>(
    &self, start: Instant, interval: Duration, _tolerance: Duration, mut task: F,
  ) -> AnyCancellable
  where
    F: FnMut() + Send + 'static,
  {
    let start = tokio::time::Instant::from_std(start);
    let interval = interval.max(Duration::from_millis(1));
    let join = self.handle.spawn(async move {
      let mut ticks = tokio::time::interval_at(start, interval);
      loop {
        ticks.tick().await;
        task();
      }
    });
    AnyCancellable::new(move || join.abort())
  }
}
