//! Where and when time-based operators run their work.
//!
//! The core never creates threads or timers. Operators such as `debounce`,
//! `delay` or `receive_on` take a [`Scheduler`] and hand it closures.
//!
//! Shipped schedulers:
//!
//! - [`ImmediateScheduler`] runs everything inline, ignoring due times.
//! - [`TestScheduler`] keeps a virtual clock that only moves when a test
//!   advances it.
//! - `TokioScheduler` (cargo feature `tokio-scheduler`) spawns onto a tokio
//!   runtime.

use std::time::{Duration, Instant};

use crate::subscription::AnyCancellable;

mod immediate;
mod test_scheduler;
#[cfg(feature = "tokio-scheduler")]
mod tokio_scheduler;

pub use immediate::ImmediateScheduler;
pub use test_scheduler::{TestScheduler, VirtualTime};
#[cfg(feature = "tokio-scheduler")]
pub use tokio_scheduler::TokioScheduler;

/// A scheduler's notion of a point in time.
pub trait SchedulerTime: Copy + Ord + Send + Sync + 'static {
  /// This instant moved `by` into the future.
  fn advanced(self, by: Duration) -> Self;

  /// How far `later` is ahead of `self`, zero if it is not.
  fn distance_to(self, later: Self) -> Duration;
}

impl SchedulerTime for Instant {
  #[inline]
  fn advanced(self, by: Duration) -> Self { self + by }

  #[inline]
  fn distance_to(self, later: Self) -> Duration { later.saturating_duration_since(self) }
}

/// Runs closures now, later, or repeatedly.
///
/// Work scheduled with [`schedule_after`](Scheduler::schedule_after) can't
/// be withdrawn; operators that may abandon a timer compare a generation
/// counter when it fires instead.
pub trait Scheduler: Clone + Send + Sync + 'static {
  type Time: SchedulerTime;

  fn now(&self) -> Self::Time;

  /// The smallest tolerance this scheduler honors.
  fn minimum_tolerance(&self) -> Duration { Duration::ZERO }

  /// Runs `task` as soon as possible.
  fn schedule<F>(&self, task: F)
  where
    F: FnOnce() + Send + 'static;

  /// Runs `task` once, no earlier than `due`.
  fn schedule_after<F>(&self, due: Self::Time, tolerance: Duration, task: F)
  where
    F: FnOnce() + Send + 'static;

  /// Runs `task` at `start` and then every `interval` until the returned
  /// handle is cancelled or dropped.
  fn schedule_repeating<F>(
    &self, start: Self::Time, interval: Duration, tolerance: Duration, task: F,
  ) -> AnyCancellable
  where
    F: FnMut() + Send + 'static;

  /// `schedule_after` relative to [`now`](Scheduler::now).
  fn schedule_in<F>(&self, delay: Duration, task: F)
  where
    F: FnOnce() + Send + 'static,
  {
    let due = self.now().advanced(delay);
    self.schedule_after(due, self.minimum_tolerance(), task);
  }
}
