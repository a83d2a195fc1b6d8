use std::{collections::VecDeque, sync::Mutex};

use crate::{completion::Completion, demand::Demand, rc::lock, subscriber::Subscriber};

pub(crate) enum Event<T, E> {
  Value(T),
  Completion(Completion<E>),
}

/// Serializes deliveries from several upstreams into one downstream.
///
/// Producers push under the owner's lock. Whoever finds the outbox idle
/// becomes the drainer and delivers queued events one by one with the lock
/// released; everyone else just leaves their event in the queue. This keeps
/// downstream calls from overlapping and lets a downstream call back into
/// the owner synchronously.
pub(crate) struct Outbox<T, E> {
  queue: VecDeque<Event<T, E>>,
  draining: bool,
  closed: bool,
}

impl<T, E> Default for Outbox<T, E> {
  fn default() -> Self { Self { queue: VecDeque::new(), draining: false, closed: false } }
}

impl<T, E> Outbox<T, E> {
  pub fn push_value(&mut self, value: T) -> bool {
    if self.closed {
      return false;
    }
    self.queue.push_back(Event::Value(value));
    true
  }

  /// Queues the single completion. `false` if one was already queued.
  pub fn push_completion(&mut self, completion: Completion<E>) -> bool {
    if self.closed {
      return false;
    }
    self.closed = true;
    self.queue.push_back(Event::Completion(completion));
    true
  }

  #[inline]
  pub fn is_closed(&self) -> bool { self.closed }

  /// `true` when the caller must drain.
  pub fn begin_drain(&mut self) -> bool {
    if self.draining || self.queue.is_empty() {
      return false;
    }
    self.draining = true;
    true
  }

  fn next(&mut self) -> Option<Event<T, E>> {
    let event = self.queue.pop_front();
    if event.is_none() {
      self.draining = false;
    }
    event
  }

  /// Drops everything queued and refuses further events.
  pub fn close(&mut self) {
    self.closed = true;
    self.queue.clear();
  }
}

/// Delivers queued events until the outbox is empty. Demand returned by the
/// downstream is handed to `on_demand` with no lock held.
pub(crate) fn drain<S, T, E, D>(
  state: &Mutex<S>,
  outbox: impl Fn(&mut S) -> &mut Outbox<T, E>,
  downstream: &D,
  mut on_demand: impl FnMut(Demand),
) where
  D: Subscriber<Input = T, Failure = E>,
{
  loop {
    let event = outbox(&mut *lock(state)).next();
    match event {
      None => return,
      Some(Event::Value(value)) => {
        let more = downstream.receive(value);
        if more > Demand::NONE {
          on_demand(more);
        }
      }
      Some(Event::Completion(completion)) => downstream.receive_completion(completion),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_one_drainer() {
    let mut outbox: Outbox<i32, ()> = Outbox::default();
    assert!(!outbox.begin_drain());
    outbox.push_value(1);
    assert!(outbox.begin_drain());
    outbox.push_value(2);
    assert!(!outbox.begin_drain());
    assert!(matches!(outbox.next(), Some(Event::Value(1))));
    assert!(matches!(outbox.next(), Some(Event::Value(2))));
    assert!(outbox.next().is_none());
    outbox.push_value(3);
    assert!(outbox.begin_drain());
  }

  #[test]
  fn completion_closes() {
    let mut outbox: Outbox<i32, ()> = Outbox::default();
    assert!(outbox.push_completion(Completion::Finished));
    assert!(!outbox.push_completion(Completion::Failure(())));
    assert!(!outbox.push_value(1));
    outbox.close();
    assert!(!outbox.begin_drain());
  }
}
