use std::{collections::VecDeque, fmt, sync::Arc};

use crate::{
  channel::AnonymousChannel,
  completion::Completion,
  demand::Demand,
  publisher::Publisher,
  rc::MutArc,
  subscriber::Subscriber,
};

/// When a [`Buffer`] asks its upstream for values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrefetchStrategy {
  /// Fill the buffer right away and top it up after every delivery.
  KeepFull,
  /// Pass the downstream's requests through.
  ByRequest,
}

/// What a full [`Buffer`] does with one value too many.
pub enum BufferingStrategy<E> {
  /// Discard the arriving value.
  DropNewest,
  /// Discard the oldest buffered value to make room.
  DropOldest,
  /// Fail the stream with the error the closure builds.
  CustomError(Arc<dyn Fn() -> E + Send + Sync>),
}

impl<E> BufferingStrategy<E> {
  pub fn custom_error(make_error: impl Fn() -> E + Send + Sync + 'static) -> Self {
    BufferingStrategy::CustomError(Arc::new(make_error))
  }
}

impl<E> Clone for BufferingStrategy<E> {
  fn clone(&self) -> Self {
    match self {
      BufferingStrategy::DropNewest => BufferingStrategy::DropNewest,
      BufferingStrategy::DropOldest => BufferingStrategy::DropOldest,
      BufferingStrategy::CustomError(make) => BufferingStrategy::CustomError(make.clone()),
    }
  }
}

impl<E> fmt::Debug for BufferingStrategy<E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BufferingStrategy::DropNewest => f.write_str("DropNewest"),
      BufferingStrategy::DropOldest => f.write_str("DropOldest"),
      BufferingStrategy::CustomError(_) => f.write_str("CustomError"),
    }
  }
}

/// Holds up to `size` values the downstream has not asked for yet.
///
/// A normal finish waits until the buffered values are delivered; a
/// failure discards them.
#[derive(Clone)]
pub struct Buffer<P: Publisher> {
  upstream: P,
  size: usize,
  prefetch: PrefetchStrategy,
  when_full: BufferingStrategy<P::Failure>,
}

impl<P: Publisher> Buffer<P> {
  pub(crate) fn new(
    upstream: P, size: usize, prefetch: PrefetchStrategy, when_full: BufferingStrategy<P::Failure>,
  ) -> Self {
    Buffer { upstream, size: size.max(1), prefetch, when_full }
  }
}

struct Buffered<T, E> {
  queue: VecDeque<T>,
  demand: Demand,
  completion: Option<Completion<E>>,
  draining: bool,
}

enum Next<T, E> {
  Value(T),
  Done(Completion<E>),
}

/// Delivers while there is demand. Only one caller delivers at a time, the
/// others leave their work in the buffer.
fn drain<I, E, D>(ch: &AnonymousChannel<I, E, D>, buffered: &MutArc<Buffered<I, E>>, prefetch: PrefetchStrategy)
where
  I: Send + 'static,
  E: Send + 'static,
  D: Subscriber<Input = I, Failure = E>,
{
  {
    let mut b = buffered.rc_deref_mut();
    if b.draining {
      return;
    }
    b.draining = true;
  }
  loop {
    let next = {
      let mut b = buffered.rc_deref_mut();
      let value = if b.demand > Demand::NONE { b.queue.pop_front() } else { None };
      match value {
        Some(value) => {
          b.demand -= 1;
          Some(Next::Value(value))
        }
        None if b.queue.is_empty() => b.completion.take().map(Next::Done),
        None => None,
      }
    };
    match next {
      Some(Next::Value(value)) => {
        let more = ch.send(value);
        buffered.rc_deref_mut().demand += more;
        match prefetch {
          PrefetchStrategy::KeepFull => ch.request_upstream(Demand::max(1)),
          PrefetchStrategy::ByRequest if more > Demand::NONE => ch.request_upstream(more),
          PrefetchStrategy::ByRequest => {}
        }
      }
      Some(Next::Done(completion)) => {
        buffered.rc_deref_mut().draining = false;
        ch.terminate(completion);
        return;
      }
      None => {
        let mut b = buffered.rc_deref_mut();
        // Work may have arrived between the pop and here.
        let has_work =
          (b.demand > Demand::NONE && !b.queue.is_empty()) || (b.queue.is_empty() && b.completion.is_some());
        if !has_work {
          b.draining = false;
          return;
        }
      }
    }
  }
}

impl<P: Publisher> Publisher for Buffer<P> {
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = P::Failure>,
  {
    let buffered =
      MutArc::own(Buffered { queue: VecDeque::new(), demand: Demand::NONE, completion: None, draining: false });
    let (on_value, on_completion, on_request, on_cancel) =
      (buffered.clone(), buffered.clone(), buffered.clone(), buffered);
    let (size, prefetch, when_full) = (self.size, self.prefetch, self.when_full.clone());

    let channel = AnonymousChannel::<P::Output, P::Failure, S>::builder(
      subscriber,
      move |ch, value| {
        {
          let mut b = on_value.rc_deref_mut();
          if b.queue.len() < size {
            b.queue.push_back(value);
          } else {
            match &when_full {
              BufferingStrategy::DropNewest => {}
              BufferingStrategy::DropOldest => {
                b.queue.pop_front();
                b.queue.push_back(value);
              }
              BufferingStrategy::CustomError(make_error) => {
                b.queue.clear();
                b.completion = Some(Completion::Failure(make_error()));
              }
            }
          }
        }
        drain(ch, &on_value, prefetch);
        Demand::NONE
      },
      move |ch, completion| {
        {
          let mut b = on_completion.rc_deref_mut();
          if completion.is_failure() {
            b.queue.clear();
          }
          b.completion.get_or_insert(completion);
        }
        drain(ch, &on_completion, prefetch);
      },
    )
    .on_subscription(move |ch, subscription| {
      ch.forward_subscription();
      if prefetch == PrefetchStrategy::KeepFull {
        subscription.request(Demand::max(size));
      }
    })
    .on_request(move |ch, demand| {
      on_request.rc_deref_mut().demand += demand;
      if prefetch == PrefetchStrategy::ByRequest {
        ch.request_upstream(demand);
      }
      drain(ch, &on_request, prefetch);
    })
    .on_cancel(move |_| on_cancel.rc_deref_mut().queue.clear())
    .build();
    self.upstream.subscribe(channel);
  }
}

#[cfg(test)]
mod tests {
  use thiserror::Error;

  use crate::{
    prelude::*,
    test_util::{Manual, Recorder},
  };

  #[derive(Debug, Clone, PartialEq, Error)]
  enum Overflow {
    #[error("buffer overflow")]
    Full,
  }

  #[test]
  fn keep_full_prefetches_and_tops_up() {
    let upstream = Manual::<i32, Never>::new();
    let rec = Recorder::with_demand(Demand::NONE, Demand::NONE);
    upstream
      .clone()
      .buffer(3, PrefetchStrategy::KeepFull, BufferingStrategy::DropNewest)
      .subscribe(rec.clone());
    assert_eq!(upstream.total_requested(), Demand::max(3));

    upstream.send(1);
    upstream.send(2);
    assert!(rec.values().is_empty());
    rec.request(Demand::max(1));
    assert_eq!(rec.values(), vec![1]);
    assert_eq!(upstream.total_requested(), Demand::max(4));
  }

  #[test]
  fn drop_newest_and_drop_oldest() {
    for (strategy, expected) in [
      (BufferingStrategy::DropNewest, vec![1, 2]),
      (BufferingStrategy::DropOldest, vec![3, 4]),
    ] {
      let upstream = Manual::<i32, Never>::new();
      let rec = Recorder::with_demand(Demand::NONE, Demand::NONE);
      upstream.clone().buffer(2, PrefetchStrategy::ByRequest, strategy).subscribe(rec.clone());
      for v in 1..=4 {
        upstream.send(v);
      }
      rec.request(Demand::UNLIMITED);
      assert_eq!(rec.values(), expected);
    }
  }

  #[test]
  fn custom_error_on_overflow() {
    let upstream = Manual::<i32, Overflow>::new();
    let rec = Recorder::with_demand(Demand::NONE, Demand::NONE);
    upstream
      .clone()
      .buffer(1, PrefetchStrategy::ByRequest, BufferingStrategy::custom_error(|| Overflow::Full))
      .subscribe(rec.clone());
    upstream.send(1);
    upstream.send(2);
    assert_eq!(rec.completions(), vec![Completion::Failure(Overflow::Full)]);
    assert_eq!(upstream.cancels(), 1);
  }

  #[test]
  fn finish_waits_for_buffered_values() {
    let upstream = Manual::<i32, Never>::new();
    let rec = Recorder::with_demand(Demand::NONE, Demand::NONE);
    upstream
      .clone()
      .buffer(4, PrefetchStrategy::KeepFull, BufferingStrategy::DropNewest)
      .subscribe(rec.clone());
    upstream.send(1);
    upstream.send(2);
    upstream.complete(Completion::Finished);
    assert!(rec.completions().is_empty());
    rec.request(Demand::max(2));
    assert_eq!(rec.values(), vec![1, 2]);
    assert_eq!(rec.completions(), vec![Completion::Finished]);
  }

  #[test]
  fn by_request_passes_demand_through() {
    let upstream = Manual::<i32, Never>::new();
    let rec = Recorder::with_demand(Demand::max(2), Demand::NONE);
    upstream
      .clone()
      .buffer(4, PrefetchStrategy::ByRequest, BufferingStrategy::DropNewest)
      .subscribe(rec.clone());
    assert_eq!(upstream.requests(), vec![Demand::max(2)]);
    upstream.send(1);
    assert_eq!(rec.values(), vec![1]);
  }
}
