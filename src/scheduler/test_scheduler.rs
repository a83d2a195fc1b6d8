//! A virtual-time scheduler for deterministic tests of time-based operators.
//!
//! Time only moves when the test says so. Due tasks run synchronously on
//! the thread that advances the clock, earliest first and FIFO among tasks
//! due at the same instant.
//!
//! ```rust
//! use std::time::Duration;
//! use traffic::prelude::*;
//!
//! let scheduler = TestScheduler::new();
//! let seen = MutArc::own(vec![]);
//! let c_seen = seen.clone();
//! let _c = publisher::just(42)
//!   .delay(Duration::from_millis(100), scheduler.clone())
//!   .sink_value(move |v| c_seen.rc_deref_mut().push(v));
//!
//! scheduler.advance_by(Duration::from_millis(99));
//! assert!(seen.get().is_empty());
//! scheduler.advance_by(Duration::from_millis(1));
//! assert_eq!(seen.get(), vec![42]);
//! ```

use std::{
  cmp::Ordering,
  collections::BinaryHeap,
  fmt,
  sync::{
    atomic::{AtomicBool, Ordering as AtomicOrdering},
    Arc, Mutex,
  },
  time::Duration,
};

use super::{Scheduler, SchedulerTime};
use crate::{rc::lock, subscription::AnyCancellable};

/// An instant on a [`TestScheduler`]'s clock, measured from its creation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct VirtualTime(Duration);

impl VirtualTime {
  pub const ZERO: VirtualTime = VirtualTime(Duration::ZERO);

  #[inline]
  pub const fn from_duration(since_start: Duration) -> Self { VirtualTime(since_start) }

  /// Time elapsed since the clock started.
  #[inline]
  pub const fn elapsed(&self) -> Duration { self.0 }
}

impl SchedulerTime for VirtualTime {
  #[inline]
  fn advanced(self, by: Duration) -> Self { VirtualTime(self.0.saturating_add(by)) }

  #[inline]
  fn distance_to(self, later: Self) -> Duration { later.0.saturating_sub(self.0) }
}

impl fmt::Display for VirtualTime {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:?}", self.0) }
}

// ==================== Internal State ====================

enum Work {
  Once(Box<dyn FnOnce() + Send>),
  Repeating {
    task: Box<dyn FnMut() + Send>,
    interval: Duration,
    cancelled: Arc<AtomicBool>,
  },
}

struct ScheduledTask {
  due: VirtualTime,
  task_id: u64,
  work: Work,
}

impl PartialEq for ScheduledTask {
  fn eq(&self, other: &Self) -> bool { self.due == other.due && self.task_id == other.task_id }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for ScheduledTask {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier times first, then FIFO by task_id
    other.due.cmp(&self.due).then_with(|| other.task_id.cmp(&self.task_id))
  }
}

#[derive(Default)]
struct State {
  now: VirtualTime,
  queue: BinaryHeap<ScheduledTask>,
  next_task_id: u64,
}

impl State {
  fn push(&mut self, due: VirtualTime, work: Work) {
    let task_id = self.next_task_id;
    self.next_task_id += 1;
    // Never schedule into the past.
    let due = due.max(self.now);
    self.queue.push(ScheduledTask { due, task_id, work });
  }
}

// ==================== TestScheduler ====================

/// A scheduler driven by an explicit virtual clock.
///
/// Clones share the same clock and queue.
#[derive(Clone, Default)]
pub struct TestScheduler {
  state: Arc<Mutex<State>>,
}

impl TestScheduler {
  pub fn new() -> Self { Self::default() }

  /// Number of tasks waiting in the queue.
  pub fn pending_count(&self) -> usize { lock(&self.state).queue.len() }

  pub fn is_empty(&self) -> bool { lock(&self.state).queue.is_empty() }

  /// Moves the clock forward by `duration`, running every task that falls
  /// due on the way.
  pub fn advance_by(&self, duration: Duration) {
    let target = lock(&self.state).now.advanced(duration);
    self.advance_to(target);
  }

  /// Moves the clock to `target`, running every task that falls due on the
  /// way. Moving backwards does nothing.
  pub fn advance_to(&self, target: VirtualTime) {
    self.execute_until(Some(target));
    let mut state = lock(&self.state);
    state.now = state.now.max(target);
  }

  /// Runs tasks until the queue is empty, jumping the clock to each one.
  /// Never returns while a repeating task is still scheduled.
  pub fn run(&self) { self.execute_until(None) }

  fn execute_until(&self, target: Option<VirtualTime>) {
    loop {
      let task = {
        let mut state = lock(&self.state);
        let should_stop = state
          .queue
          .peek()
          .is_none_or(|peek| target.is_some_and(|limit| peek.due > limit));
        if should_stop {
          return;
        }
        let Some(task) = state.queue.pop() else { return };
        state.now = task.due;
        task
      };

      match task.work {
        Work::Once(work) => work(),
        Work::Repeating { task: mut work, interval, cancelled } => {
          if cancelled.load(AtomicOrdering::SeqCst) {
            continue;
          }
          work();
          if !cancelled.load(AtomicOrdering::SeqCst) {
            let next = task.due.advanced(interval);
            lock(&self.state).push(next, Work::Repeating { task: work, interval, cancelled });
          }
        }
      }
    }
  }
}

impl Scheduler for TestScheduler {
  type Time = VirtualTime;

  fn now(&self) -> VirtualTime { lock(&self.state).now }

  fn schedule<F>(&self, task: F)
  where
    F: FnOnce() + Send + 'static,
  {
    let mut state = lock(&self.state);
    let now = state.now;
    state.push(now, Work::Once(Box::new(task)));
  }

  fn schedule_after<F>(&self, due: VirtualTime, _tolerance: Duration, task: F)
  where
    F: FnOnce() + Send + 'static,
  {
    lock(&self.state).push(due, Work::Once(Box::new(task)));
  }

  fn schedule_repeating<F>(
    &self, start: VirtualTime, interval: Duration, _tolerance: Duration, task: F,
  ) -> AnyCancellable
  where
    F: FnMut() + Send + 'static,
  {
    let cancelled = Arc::new(AtomicBool::new(false));
    // A zero interval would pin the clock forever.
    let interval = interval.max(Duration::from_nanos(1));
    lock(&self.state).push(
      start,
      Work::Repeating { task: Box::new(task), interval, cancelled: cancelled.clone() },
    );
    AnyCancellable::new(move || cancelled.store(true, AtomicOrdering::SeqCst))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::rc::MutArc;

  type Log = MutArc<Vec<(&'static str, Duration)>>;

  fn log_at(s: &TestScheduler, log: &Log, name: &'static str) -> impl FnOnce() + Send + 'static {
    let s = s.clone();
    let log = log.clone();
    move || log.rc_deref_mut().push((name, s.now().elapsed()))
  }

  #[test]
  fn advance_by_is_cumulative() {
    let s = TestScheduler::new();
    s.advance_by(Duration::from_millis(100));
    s.advance_by(Duration::from_millis(50));
    assert_eq!(s.now().elapsed(), Duration::from_millis(150));
  }

  #[test]
  fn runs_in_due_order_then_fifo() {
    let s = TestScheduler::new();
    let log = MutArc::own(vec![]);
    s.schedule_in(Duration::from_millis(20), log_at(&s, &log, "late"));
    s.schedule_in(Duration::from_millis(10), log_at(&s, &log, "early-1"));
    s.schedule_in(Duration::from_millis(10), log_at(&s, &log, "early-2"));
    s.schedule(log_at(&s, &log, "now"));

    s.advance_by(Duration::from_millis(10));
    assert_eq!(
      log.get(),
      vec![
        ("now", Duration::ZERO),
        ("early-1", Duration::from_millis(10)),
        ("early-2", Duration::from_millis(10)),
      ]
    );
    s.run();
    assert_eq!(log.get().last(), Some(&("late", Duration::from_millis(20))));
    assert!(s.is_empty());
  }

  #[test]
  fn tasks_may_schedule_more_tasks() {
    let s = TestScheduler::new();
    let log = MutArc::own(vec![]);
    let inner = log_at(&s, &log, "inner");
    let c_s = s.clone();
    s.schedule_in(Duration::from_millis(5), move || c_s.schedule_in(Duration::from_millis(5), inner));
    s.advance_by(Duration::from_millis(10));
    assert_eq!(log.get(), vec![("inner", Duration::from_millis(10))]);
  }

  #[test]
  fn repeating_until_cancelled() {
    let s = TestScheduler::new();
    let ticks = MutArc::own(vec![]);
    let c_ticks = ticks.clone();
    let c_s = s.clone();
    let handle = s.schedule_repeating(
      s.now().advanced(Duration::from_millis(10)),
      Duration::from_millis(10),
      Duration::ZERO,
      move || c_ticks.rc_deref_mut().push(c_s.now().elapsed().as_millis()),
    );
    s.advance_by(Duration::from_millis(35));
    assert_eq!(ticks.get(), vec![10, 20, 30]);
    drop(handle);
    s.advance_by(Duration::from_millis(100));
    assert_eq!(ticks.get(), vec![10, 20, 30]);
  }
}
