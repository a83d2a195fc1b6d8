//! Batching operators: `collect_by_count` and `collect_by_time`.

use std::{marker::PhantomData, time::Duration};

use crate::{
  channel::{AnonymousChannel, Step, Transform, TransformChannel},
  completion::Completion,
  demand::Demand,
  publisher::Publisher,
  rc::MutArc,
  scheduler::{Scheduler, SchedulerTime},
  subscriber::Subscriber,
  subscription::AnyCancellable,
};

/// Emits values in batches of `count`. A final partial batch is emitted
/// when the upstream finishes.
#[derive(Clone)]
pub struct CollectByCount<P> {
  upstream: P,
  count: usize,
}

impl<P> CollectByCount<P> {
  pub(crate) fn new(upstream: P, count: usize) -> Self { CollectByCount { upstream, count: count.max(1) } }
}

struct BatchLogic<I, E> {
  items: Vec<I>,
  count: usize,
  _marker: PhantomData<fn() -> E>,
}

impl<I: Send + 'static, E: Send + 'static> Transform for BatchLogic<I, E> {
  type Input = I;
  type Output = Vec<I>;
  type Failure = E;

  fn transform(&mut self, input: I) -> Result<Step<Vec<I>>, E> {
    self.items.push(input);
    if self.items.len() < self.count {
      return Ok(Step::Skip);
    }
    Ok(Step::Emit(std::mem::replace(&mut self.items, Vec::with_capacity(self.count))))
  }

  fn will_complete(&mut self) -> Result<Option<Vec<I>>, E> {
    Ok(Some(std::mem::take(&mut self.items)).filter(|items| !items.is_empty()))
  }

  // One batch costs `count` upstream values.
  fn upstream_demand(&self, demand: Demand) -> Demand { demand * self.count }
}

impl<P: Publisher> Publisher for CollectByCount<P> {
  type Output = Vec<P::Output>;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = Vec<P::Output>, Failure = P::Failure>,
  {
    let logic = BatchLogic { items: Vec::with_capacity(self.count), count: self.count, _marker: PhantomData };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}

/// When `collect_by_time` closes a batch.
#[derive(Clone, Debug)]
pub enum TimeGroupingStrategy<SD> {
  /// Every `interval`.
  ByTime(SD, Duration),
  /// Every `interval`, or as soon as `count` values are waiting.
  ByTimeOrCount(SD, Duration, usize),
}

/// Emits the values collected during each interval as one batch. Empty
/// intervals emit nothing, and a batch waits while the downstream has no
/// demand.
#[derive(Clone)]
pub struct CollectByTime<P, SD> {
  upstream: P,
  strategy: TimeGroupingStrategy<SD>,
}

impl<P, SD> CollectByTime<P, SD> {
  pub(crate) fn new(upstream: P, strategy: TimeGroupingStrategy<SD>) -> Self {
    CollectByTime { upstream, strategy }
  }
}

struct Batch<T> {
  items: Vec<T>,
  timer: Option<AnyCancellable>,
}

fn flush<I, E, D>(ch: &AnonymousChannel<I, E, D>, batch: &MutArc<Batch<I>>)
where
  I: Send + 'static,
  E: Send + 'static,
  D: Subscriber<Input = Vec<I>>,
{
  if ch.demand() == Demand::NONE {
    return;
  }
  let items = {
    let mut batch = batch.rc_deref_mut();
    if batch.items.is_empty() {
      return;
    }
    std::mem::take(&mut batch.items)
  };
  ch.enqueue(items);
}

impl<P: Publisher, SD: Scheduler> Publisher for CollectByTime<P, SD> {
  type Output = Vec<P::Output>;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = Vec<P::Output>, Failure = P::Failure>,
  {
    let (scheduler, interval, count) = match &self.strategy {
      TimeGroupingStrategy::ByTime(scheduler, interval) => (scheduler.clone(), *interval, None),
      TimeGroupingStrategy::ByTimeOrCount(scheduler, interval, count) => {
        (scheduler.clone(), *interval, Some((*count).max(1)))
      }
    };
    let batch = MutArc::own(Batch { items: vec![], timer: None });
    let (on_value, on_completion, on_subscription, on_cancel) =
      (batch.clone(), batch.clone(), batch.clone(), batch);

    let channel = AnonymousChannel::<P::Output, P::Failure, S>::builder(
      subscriber,
      move |ch, value| {
        let full = {
          let mut batch = on_value.rc_deref_mut();
          batch.items.push(value);
          count.is_some_and(|count| batch.items.len() >= count)
        };
        if full {
          flush(ch, &on_value);
        }
        Demand::NONE
      },
      move |ch, completion: Completion<P::Failure>| {
        let (timer, items) = {
          let mut batch = on_completion.rc_deref_mut();
          (batch.timer.take(), std::mem::take(&mut batch.items))
        };
        drop(timer);
        if completion.is_finished() && !items.is_empty() {
          ch.enqueue(items);
        }
        ch.enqueue_completion(completion);
      },
    )
    .on_subscription(move |ch, subscription| {
      if let Some(me) = ch.arc() {
        let batch = on_subscription.clone();
        let start = scheduler.now().advanced(interval);
        let timer =
          scheduler.schedule_repeating(start, interval, scheduler.minimum_tolerance(), move || flush(&me, &batch));
        on_subscription.rc_deref_mut().timer = Some(timer);
      }
      ch.forward_subscription();
      subscription.request(Demand::UNLIMITED);
    })
    .on_request(|ch, demand| ch.add_demand(demand))
    .on_cancel(move |_| {
      let timer = {
        let mut batch = on_cancel.rc_deref_mut();
        batch.items.clear();
        batch.timer.take()
      };
      drop(timer);
    })
    .build();
    self.upstream.subscribe(channel);
  }
}
