use std::time::{Duration, Instant};

use super::Scheduler;
use crate::subscription::AnyCancellable;

/// Runs every task synchronously on the calling thread.
///
/// Due times are ignored, and a repeating task runs exactly once. Useful
/// where an operator demands a scheduler but the caller wants no hop.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
  type Time = Instant;

  fn now(&self) -> Instant { Instant::now() }

  fn schedule<F>(&self, task: F)
  where
    F: FnOnce() + Send + 'static,
  {
    task()
  }

  fn schedule_after<F>(&self, _due: Instant, _tolerance: Duration, task: F)
  where
    F: FnOnce() + Send + 'static,
  {
    task()
  }

  fn schedule_repeating<F>(
    &self, _start: Instant, _interval: Duration, _tolerance: Duration, mut task: F,
  ) -> AnyCancellable
  where
    F: FnMut() + Send + 'static,
  {
    task();
    AnyCancellable::empty()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use super::*;

  #[test]
  fn everything_runs_inline() {
    let hits = Arc::new(AtomicUsize::new(0));
    let s = ImmediateScheduler;
    let h = hits.clone();
    s.schedule(move || {
      h.fetch_add(1, Ordering::SeqCst);
    });
    let h = hits.clone();
    s.schedule_in(Duration::from_secs(60), move || {
      h.fetch_add(1, Ordering::SeqCst);
    });
    let h = hits.clone();
    let _handle = s.schedule_repeating(s.now(), Duration::from_secs(1), Duration::ZERO, move || {
      h.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(hits.load(Ordering::SeqCst), 3);
  }
}
