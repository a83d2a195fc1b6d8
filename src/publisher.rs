//! The producer half of the protocol, and every operator.
//!
//! A [`Publisher`] does nothing until it is subscribed. Each call to
//! [`Publisher::subscribe`] builds a fresh chain of channels, one per
//! operator, ending in the subscriber. Operators are provided methods that
//! consume the upstream and return the operator's publisher type, so a
//! pipeline reads left to right:
//!
//! ```rust
//! use traffic::prelude::*;
//!
//! let seen = MutArc::own(vec![]);
//! let c_seen = seen.clone();
//! let _c = publisher::from_iter(1..=10)
//!   .filter(|v| v % 3 == 0)
//!   .map(|v| v * 2)
//!   .sink_value(move |v| c_seen.rc_deref_mut().push(v));
//! assert_eq!(seen.get(), vec![6, 12, 18]);
//! ```

use std::{
  cmp::Ordering,
  ops::RangeBounds,
  sync::Arc,
  time::Duration,
};

use serde::de::DeserializeOwned;

use crate::{
  completion::Completion,
  demand::Demand,
  ops::{
    autoconnect::{Autoconnect, Share},
    buffer::{Buffer, BufferingStrategy, PrefetchStrategy},
    catch::{Catch, TryCatch},
    coding::{Decode, Encode, TopLevelDecoder, TopLevelEncoder},
    collect_by::{CollectByCount, CollectByTime, TimeGroupingStrategy},
    combine_latest::CombineLatest,
    comparison::{Comparison, Keep},
    concatenate::Concatenate,
    debounce::Debounce,
    delay::Delay,
    drop_while::{DropWhile, TryDropWhile},
    filter::{CompactMap, Filter, TryCompactMap, TryFilter},
    first::{First, FirstWhere, TryFirstWhere},
    flat_map::FlatMap,
    handle_events::HandleEvents,
    last::{Last, LastWhere, TryLastWhere},
    map::{Map, TryMap},
    map_error::{AssertNoFailure, MapError, SetFailureType},
    measure_interval::MeasureInterval,
    merge::{Merge, MergeMany},
    multicast::{MakeConnectable, Multicast},
    output::OutputRange,
    prefix_while::{PrefixWhile, TryPrefixWhile},
    receive_on::ReceiveOn,
    reduce::{Collect, Count, IgnoreOutput, Reduce, TryReduce},
    remove_duplicates::{RemoveDuplicates, TryRemoveDuplicates},
    replace::{ReplaceEmpty, ReplaceError},
    retry::Retry,
    satisfy::{AllSatisfy, Contains, ContainsWhere, TryAllSatisfy, TryContainsWhere},
    scan::{Scan, TryScan},
    subscribe_on::SubscribeOn,
    switch_to_latest::SwitchToLatest,
    throttle::Throttle,
    timeout::Timeout,
    until_output::{DropUntilOutput, PrefixUntilOutput},
    values::Values,
    zip::Zip,
  },
  rc::MutArc,
  scheduler::Scheduler,
  subject::{Subject, SubjectSubscriber},
  subscriber::{Assign, Sink, Subscriber},
  subscription::AnyCancellable,
  Never,
};

pub mod any_publisher;
pub mod future;
pub mod record;
pub mod sequence;

pub use any_publisher::AnyPublisher;
pub use future::{FuturePublisher, Promise};
pub use record::{Record, Recording};
pub use sequence::{Empty, Fail, Just, ResultPublisher, Sequence};

fn always<T>(_: &T) -> bool { true }

/// Produces values for subscribers that ask for them.
///
/// Implementations announce themselves to a subscriber exactly once with a
/// subscription, deliver no more values than were requested through it,
/// and end with at most one completion.
pub trait Publisher {
  type Output: Send + 'static;
  type Failure: Send + 'static;

  /// Attaches `subscriber`. Nothing is delivered until it requests demand.
  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = Self::Output, Failure = Self::Failure>;

  // ==================== Subscribing ====================

  /// Subscribes with closures, requesting unlimited values. The returned
  /// handle cancels the subscription when cancelled or dropped.
  fn sink<C, V>(&self, receive_completion: C, receive_value: V) -> AnyCancellable
  where
    C: Fn(Completion<Self::Failure>) + Send + Sync + 'static,
    V: Fn(Self::Output) + Send + Sync + 'static,
  {
    let sink = Arc::new(Sink::new(receive_completion, receive_value));
    self.subscribe(sink.clone());
    AnyCancellable::from_cancellable(sink)
  }

  fn sink_value<V>(&self, receive_value: V) -> AnyCancellable
  where
    Self: Publisher<Failure = Never>,
    V: Fn(Self::Output) + Send + Sync + 'static,
  {
    self.sink(|_| {}, receive_value)
  }

  /// Writes every value into `root` through `setter`.
  fn assign<R, F>(&self, root: MutArc<R>, setter: F) -> AnyCancellable
  where
    Self: Publisher<Failure = Never>,
    R: Send + 'static,
    F: Fn(&mut R, Self::Output) + Send + Sync + 'static,
  {
    let assign = Arc::new(Assign::new(root, setter));
    self.subscribe(assign.clone());
    AnyCancellable::from_cancellable(assign)
  }

  /// Feeds `subject` from this publisher until the handle is cancelled.
  fn subscribe_subject<J>(&self, subject: J) -> AnyCancellable
  where
    J: Subject<Output = Self::Output, Failure = Self::Failure>,
  {
    let bridge = Arc::new(SubjectSubscriber::new(subject));
    self.subscribe(bridge.clone());
    AnyCancellable::from_cancellable(bridge)
  }

  /// A [`futures::Stream`] of this publisher's values.
  fn values(self) -> Values<Self::Output, Self::Failure>
  where
    Self: Sized,
  {
    Values::new(self)
  }

  fn erase_to_any_publisher(self) -> AnyPublisher<Self::Output, Self::Failure>
  where
    Self: Sized + Send + Sync + 'static,
  {
    AnyPublisher::new(self)
  }

  // ==================== Mapping ====================

  fn map<U, F>(self, transform: F) -> Map<Self, F>
  where
    Self: Sized,
    F: Fn(Self::Output) -> U + Send + Sync + 'static,
  {
    Map::new(self, transform)
  }

  fn try_map<U, F>(self, transform: F) -> TryMap<Self, F>
  where
    Self: Sized,
    F: Fn(Self::Output) -> Result<U, Self::Failure> + Send + Sync + 'static,
  {
    TryMap::new(self, transform)
  }

  /// Maps and drops the `None`s.
  fn compact_map<U, F>(self, transform: F) -> CompactMap<Self, F>
  where
    Self: Sized,
    F: Fn(Self::Output) -> Option<U> + Send + Sync + 'static,
  {
    CompactMap::new(self, transform)
  }

  fn try_compact_map<U, F>(self, transform: F) -> TryCompactMap<Self, F>
  where
    Self: Sized,
    F: Fn(Self::Output) -> Result<Option<U>, Self::Failure> + Send + Sync + 'static,
  {
    TryCompactMap::new(self, transform)
  }

  fn scan<T, F>(self, initial: T, accumulate: F) -> Scan<Self, T, F>
  where
    Self: Sized,
    F: Fn(T, Self::Output) -> T + Send + Sync + 'static,
  {
    Scan::new(self, initial, accumulate)
  }

  fn try_scan<T, F>(self, initial: T, accumulate: F) -> TryScan<Self, T, F>
  where
    Self: Sized,
    F: Fn(T, Self::Output) -> Result<T, Self::Failure> + Send + Sync + 'static,
  {
    TryScan::new(self, initial, accumulate)
  }

  fn replace_empty(self, value: Self::Output) -> ReplaceEmpty<Self, Self::Output>
  where
    Self: Sized,
  {
    ReplaceEmpty::new(self, value)
  }

  /// Turns a failure into one last value and a normal finish.
  fn replace_error(self, value: Self::Output) -> ReplaceError<Self, Self::Output>
  where
    Self: Sized,
  {
    ReplaceError::new(self, value)
  }

  // ==================== Filtering ====================

  fn filter<F>(self, predicate: F) -> Filter<Self, F>
  where
    Self: Sized,
    F: Fn(&Self::Output) -> bool + Send + Sync + 'static,
  {
    Filter::new(self, predicate)
  }

  fn try_filter<F>(self, predicate: F) -> TryFilter<Self, F>
  where
    Self: Sized,
    F: Fn(&Self::Output) -> Result<bool, Self::Failure> + Send + Sync + 'static,
  {
    TryFilter::new(self, predicate)
  }

  /// Drops values equal to the one before them.
  fn remove_duplicates(self) -> RemoveDuplicates<Self, fn(&Self::Output, &Self::Output) -> bool>
  where
    Self: Sized,
    Self::Output: PartialEq,
  {
    RemoveDuplicates::new(self, <Self::Output as PartialEq>::eq as fn(&Self::Output, &Self::Output) -> bool)
  }

  fn remove_duplicates_by<F>(self, predicate: F) -> RemoveDuplicates<Self, F>
  where
    Self: Sized,
    F: Fn(&Self::Output, &Self::Output) -> bool + Send + Sync + 'static,
  {
    RemoveDuplicates::new(self, predicate)
  }

  fn try_remove_duplicates<F>(self, predicate: F) -> TryRemoveDuplicates<Self, F>
  where
    Self: Sized,
    F: Fn(&Self::Output, &Self::Output) -> Result<bool, Self::Failure> + Send + Sync + 'static,
  {
    TryRemoveDuplicates::new(self, predicate)
  }

  fn ignore_output(self) -> IgnoreOutput<Self>
  where
    Self: Sized,
  {
    IgnoreOutput::new(self)
  }

  // ==================== Reducing ====================

  fn reduce<T, F>(self, initial: T, accumulate: F) -> Reduce<Self, T, F>
  where
    Self: Sized,
    F: Fn(T, Self::Output) -> T + Send + Sync + 'static,
  {
    Reduce::new(self, initial, accumulate)
  }

  fn try_reduce<T, F>(self, initial: T, accumulate: F) -> TryReduce<Self, T, F>
  where
    Self: Sized,
    F: Fn(T, Self::Output) -> Result<T, Self::Failure> + Send + Sync + 'static,
  {
    TryReduce::new(self, initial, accumulate)
  }

  /// Every value in one `Vec`, emitted when the upstream finishes.
  fn collect(self) -> Collect<Self>
  where
    Self: Sized,
  {
    Collect::new(self)
  }

  /// Batches of `count` values; a shorter batch is flushed on finish.
  fn collect_by_count(self, count: usize) -> CollectByCount<Self>
  where
    Self: Sized,
  {
    CollectByCount::new(self, count)
  }

  fn collect_by_time<SD>(self, strategy: TimeGroupingStrategy<SD>) -> CollectByTime<Self, SD>
  where
    Self: Sized,
    SD: Scheduler,
  {
    CollectByTime::new(self, strategy)
  }

  fn count(self) -> Count<Self>
  where
    Self: Sized,
  {
    Count::new(self)
  }

  // ==================== Comparing ====================

  fn min(self) -> Comparison<Self, fn(&Self::Output, &Self::Output) -> Ordering>
  where
    Self: Sized,
    Self::Output: Ord,
  {
    Comparison::new(self, <Self::Output as Ord>::cmp as fn(&Self::Output, &Self::Output) -> Ordering, Keep::Min)
  }

  fn max(self) -> Comparison<Self, fn(&Self::Output, &Self::Output) -> Ordering>
  where
    Self: Sized,
    Self::Output: Ord,
  {
    Comparison::new(self, <Self::Output as Ord>::cmp as fn(&Self::Output, &Self::Output) -> Ordering, Keep::Max)
  }

  fn min_by<F>(self, compare: F) -> Comparison<Self, F>
  where
    Self: Sized,
    F: Fn(&Self::Output, &Self::Output) -> Ordering + Send + Sync + 'static,
  {
    Comparison::new(self, compare, Keep::Min)
  }

  fn max_by<F>(self, compare: F) -> Comparison<Self, F>
  where
    Self: Sized,
    F: Fn(&Self::Output, &Self::Output) -> Ordering + Send + Sync + 'static,
  {
    Comparison::new(self, compare, Keep::Max)
  }

  // ==================== Matching ====================

  /// `true` unless some value fails `predicate`, which ends the stream
  /// early.
  fn all_satisfy<F>(self, predicate: F) -> AllSatisfy<Self, F>
  where
    Self: Sized,
    F: Fn(&Self::Output) -> bool + Send + Sync + 'static,
  {
    AllSatisfy::new(self, predicate)
  }

  fn try_all_satisfy<F>(self, predicate: F) -> TryAllSatisfy<Self, F>
  where
    Self: Sized,
    F: Fn(&Self::Output) -> Result<bool, Self::Failure> + Send + Sync + 'static,
  {
    TryAllSatisfy::new(self, predicate)
  }

  fn contains(self, value: Self::Output) -> Contains<Self, Self::Output>
  where
    Self: Sized,
    Self::Output: PartialEq,
  {
    Contains::new(self, value)
  }

  fn contains_where<F>(self, predicate: F) -> ContainsWhere<Self, F>
  where
    Self: Sized,
    F: Fn(&Self::Output) -> bool + Send + Sync + 'static,
  {
    ContainsWhere::new(self, predicate)
  }

  fn try_contains_where<F>(self, predicate: F) -> TryContainsWhere<Self, F>
  where
    Self: Sized,
    F: Fn(&Self::Output) -> Result<bool, Self::Failure> + Send + Sync + 'static,
  {
    TryContainsWhere::new(self, predicate)
  }

  // ==================== Selecting ====================

  fn first(self) -> First<Self>
  where
    Self: Sized,
  {
    FirstWhere::new(self, always::<Self::Output> as fn(&Self::Output) -> bool)
  }

  fn first_where<F>(self, predicate: F) -> FirstWhere<Self, F>
  where
    Self: Sized,
    F: Fn(&Self::Output) -> bool + Send + Sync + 'static,
  {
    FirstWhere::new(self, predicate)
  }

  fn try_first_where<F>(self, predicate: F) -> TryFirstWhere<Self, F>
  where
    Self: Sized,
    F: Fn(&Self::Output) -> Result<bool, Self::Failure> + Send + Sync + 'static,
  {
    TryFirstWhere::new(self, predicate)
  }

  fn last(self) -> Last<Self>
  where
    Self: Sized,
  {
    LastWhere::new(self, always::<Self::Output> as fn(&Self::Output) -> bool)
  }

  fn last_where<F>(self, predicate: F) -> LastWhere<Self, F>
  where
    Self: Sized,
    F: Fn(&Self::Output) -> bool + Send + Sync + 'static,
  {
    LastWhere::new(self, predicate)
  }

  fn try_last_where<F>(self, predicate: F) -> TryLastWhere<Self, F>
  where
    Self: Sized,
    F: Fn(&Self::Output) -> Result<bool, Self::Failure> + Send + Sync + 'static,
  {
    TryLastWhere::new(self, predicate)
  }

  /// The first `count` values.
  fn prefix(self, count: usize) -> OutputRange<Self>
  where
    Self: Sized,
  {
    OutputRange::new(self, ..count)
  }

  fn drop_first(self, count: usize) -> OutputRange<Self>
  where
    Self: Sized,
  {
    OutputRange::new(self, count..)
  }

  /// Only the value at `index`, counting from zero.
  fn output_at(self, index: usize) -> OutputRange<Self>
  where
    Self: Sized,
  {
    OutputRange::new(self, index..=index)
  }

  fn output_in(self, range: impl RangeBounds<usize>) -> OutputRange<Self>
  where
    Self: Sized,
  {
    OutputRange::new(self, range)
  }

  fn drop_while<F>(self, predicate: F) -> DropWhile<Self, F>
  where
    Self: Sized,
    F: Fn(&Self::Output) -> bool + Send + Sync + 'static,
  {
    DropWhile::new(self, predicate)
  }

  fn try_drop_while<F>(self, predicate: F) -> TryDropWhile<Self, F>
  where
    Self: Sized,
    F: Fn(&Self::Output) -> Result<bool, Self::Failure> + Send + Sync + 'static,
  {
    TryDropWhile::new(self, predicate)
  }

  fn prefix_while<F>(self, predicate: F) -> PrefixWhile<Self, F>
  where
    Self: Sized,
    F: Fn(&Self::Output) -> bool + Send + Sync + 'static,
  {
    PrefixWhile::new(self, predicate)
  }

  fn try_prefix_while<F>(self, predicate: F) -> TryPrefixWhile<Self, F>
  where
    Self: Sized,
    F: Fn(&Self::Output) -> Result<bool, Self::Failure> + Send + Sync + 'static,
  {
    TryPrefixWhile::new(self, predicate)
  }

  /// Republishes values until `trigger` emits anything.
  fn prefix_until_output<Q>(self, trigger: Q) -> PrefixUntilOutput<Self, Q>
  where
    Self: Sized,
    Q: Publisher,
  {
    PrefixUntilOutput::new(self, trigger)
  }

  /// Ignores values until `trigger` emits anything.
  fn drop_until_output<Q>(self, trigger: Q) -> DropUntilOutput<Self, Q>
  where
    Self: Sized,
    Q: Publisher<Failure = Self::Failure>,
  {
    DropUntilOutput::new(self, trigger)
  }

  // ==================== Failures ====================

  fn map_error<E, F>(self, transform: F) -> MapError<Self, F>
  where
    Self: Sized,
    F: Fn(Self::Failure) -> E + Send + Sync + 'static,
  {
    MapError::new(self, transform)
  }

  /// Gives a never-failing publisher a failure type, so it can be combined
  /// with publishers that do fail.
  fn set_failure_type<E>(self) -> SetFailureType<Self, E>
  where
    Self: Sized + Publisher<Failure = Never>,
  {
    SetFailureType::new(self)
  }

  /// Panics, pointing at this call, if the upstream ever fails.
  #[track_caller]
  fn assert_no_failure(self) -> AssertNoFailure<Self>
  where
    Self: Sized,
  {
    AssertNoFailure::new(self)
  }

  /// Replaces a failed upstream with the publisher `handler` returns.
  ///
  /// The replacement is asked for whatever demand the downstream still has
  /// outstanding, not for an unlimited amount.
  fn catch<Q, F>(self, handler: F) -> Catch<Self, F>
  where
    Self: Sized,
    F: Fn(Self::Failure) -> Q + Send + Sync + 'static,
    Q: Publisher<Output = Self::Output>,
  {
    Catch::new(self, handler)
  }

  /// Like [`catch`](Publisher::catch), but `handler` may fail in turn.
  fn try_catch<Q, E, F>(self, handler: F) -> TryCatch<Self, F>
  where
    Self: Sized,
    F: Fn(Self::Failure) -> Result<Q, E> + Send + Sync + 'static,
    Q: Publisher<Output = Self::Output, Failure = E>,
  {
    TryCatch::new(self, handler)
  }

  /// Subscribes again after a failure, at most `attempts` times.
  fn retry(self, attempts: usize) -> Retry<Self>
  where
    Self: Sized,
  {
    Retry::new(self, attempts)
  }

  // ==================== Side effects ====================

  /// Observes the stream's events without changing them. Attach the
  /// callbacks with the builder methods of [`HandleEvents`].
  fn handle_events(self) -> HandleEvents<Self, Self::Output, Self::Failure>
  where
    Self: Sized,
  {
    HandleEvents::new(self)
  }

  // ==================== Combining ====================

  /// This publisher's values, then `suffix`'s.
  fn append<Q>(self, suffix: Q) -> Concatenate<Self, Q>
  where
    Self: Sized,
    Q: Publisher<Output = Self::Output, Failure = Self::Failure>,
  {
    Concatenate::new(self, suffix)
  }

  /// `prefix`'s values, then this publisher's.
  fn prepend<Q>(self, prefix: Q) -> Concatenate<Q, Self>
  where
    Self: Sized,
    Q: Publisher<Output = Self::Output, Failure = Self::Failure>,
  {
    Concatenate::new(prefix, self)
  }

  fn merge<Q>(self, other: Q) -> Merge<(Self, Q)>
  where
    Self: Sized,
    Q: Publisher<Output = Self::Output, Failure = Self::Failure>,
  {
    Merge::new((self, other))
  }

  fn merge3<Q, R>(self, q: Q, r: R) -> Merge<(Self, Q, R)>
  where
    Self: Sized,
    Q: Publisher<Output = Self::Output, Failure = Self::Failure>,
    R: Publisher<Output = Self::Output, Failure = Self::Failure>,
  {
    Merge::new((self, q, r))
  }

  fn merge4<Q, R, T>(self, q: Q, r: R, t: T) -> Merge<(Self, Q, R, T)>
  where
    Self: Sized,
    Q: Publisher<Output = Self::Output, Failure = Self::Failure>,
    R: Publisher<Output = Self::Output, Failure = Self::Failure>,
    T: Publisher<Output = Self::Output, Failure = Self::Failure>,
  {
    Merge::new((self, q, r, t))
  }

  /// Merges with any number of publishers of the same type.
  fn merge_many<I>(self, others: I) -> MergeMany<Self>
  where
    Self: Sized,
    I: IntoIterator<Item = Self>,
  {
    MergeMany::new(std::iter::once(self).chain(others))
  }

  /// Tuples of every upstream's latest value, once each has produced one.
  fn combine_latest<Q>(self, other: Q) -> CombineLatest<(Self, Q)>
  where
    Self: Sized,
    Q: Publisher<Failure = Self::Failure>,
  {
    CombineLatest::new((self, other))
  }

  fn combine_latest3<Q, R>(self, q: Q, r: R) -> CombineLatest<(Self, Q, R)>
  where
    Self: Sized,
    Q: Publisher<Failure = Self::Failure>,
    R: Publisher<Failure = Self::Failure>,
  {
    CombineLatest::new((self, q, r))
  }

  fn combine_latest4<Q, R, T>(self, q: Q, r: R, t: T) -> CombineLatest<(Self, Q, R, T)>
  where
    Self: Sized,
    Q: Publisher<Failure = Self::Failure>,
    R: Publisher<Failure = Self::Failure>,
    T: Publisher<Failure = Self::Failure>,
  {
    CombineLatest::new((self, q, r, t))
  }

  /// Pairs values up by position.
  fn zip<Q>(self, other: Q) -> Zip<(Self, Q)>
  where
    Self: Sized,
    Q: Publisher<Failure = Self::Failure>,
  {
    Zip::new((self, other))
  }

  fn zip3<Q, R>(self, q: Q, r: R) -> Zip<(Self, Q, R)>
  where
    Self: Sized,
    Q: Publisher<Failure = Self::Failure>,
    R: Publisher<Failure = Self::Failure>,
  {
    Zip::new((self, q, r))
  }

  fn zip4<Q, R, T>(self, q: Q, r: R, t: T) -> Zip<(Self, Q, R, T)>
  where
    Self: Sized,
    Q: Publisher<Failure = Self::Failure>,
    R: Publisher<Failure = Self::Failure>,
    T: Publisher<Failure = Self::Failure>,
  {
    Zip::new((self, q, r, t))
  }

  /// Subscribes to the publisher `transform` makes of every value, with at
  /// most `max_publishers` of them live at once, and merges their values.
  fn flat_map<Q, F>(self, max_publishers: Demand, transform: F) -> FlatMap<Self, F>
  where
    Self: Sized,
    F: Fn(Self::Output) -> Q + Send + Sync + 'static,
    Q: Publisher<Failure = Self::Failure> + 'static,
  {
    FlatMap::new(self, max_publishers, transform)
  }

  /// Flattens a publisher of publishers, following only the most recent
  /// one.
  ///
  /// Each new inner publisher is asked for the downstream's outstanding
  /// demand rather than for an unlimited amount. Later requests go straight
  /// to the current inner publisher.
  fn switch_to_latest(self) -> SwitchToLatest<Self>
  where
    Self: Sized,
    Self::Output: Publisher<Failure = Self::Failure> + Send + 'static,
  {
    SwitchToLatest::new(self)
  }

  // ==================== Time ====================

  fn delay<SD: Scheduler>(self, interval: Duration, scheduler: SD) -> Delay<Self, SD>
  where
    Self: Sized,
  {
    Delay::new(self, interval, scheduler)
  }

  /// Emits a value only after `due_time` passes without another one.
  fn debounce<SD: Scheduler>(self, due_time: Duration, scheduler: SD) -> Debounce<Self, SD>
  where
    Self: Sized,
  {
    Debounce::new(self, due_time, scheduler)
  }

  /// At most one value per `interval`: the first of the window, then the
  /// latest (or the first) value seen while it was open.
  fn throttle<SD: Scheduler>(self, interval: Duration, scheduler: SD, latest: bool) -> Throttle<Self, SD>
  where
    Self: Sized,
  {
    Throttle::new(self, interval, scheduler, latest)
  }

  /// Finishes, or fails with [`Timeout::with_error`], when the upstream is
  /// silent for `interval`.
  fn timeout<SD: Scheduler>(self, interval: Duration, scheduler: SD) -> Timeout<Self, SD>
  where
    Self: Sized,
  {
    Timeout::new(self, interval, scheduler)
  }

  fn measure_interval<SD: Scheduler>(self, scheduler: SD) -> MeasureInterval<Self, SD>
  where
    Self: Sized,
  {
    MeasureInterval::new(self, scheduler)
  }

  fn receive_on<SD: Scheduler>(self, scheduler: SD) -> ReceiveOn<Self, SD>
  where
    Self: Sized,
  {
    ReceiveOn::new(self, scheduler)
  }

  fn subscribe_on<SD: Scheduler>(self, scheduler: SD) -> SubscribeOn<Self, SD>
  where
    Self: Sized,
  {
    SubscribeOn::new(self, scheduler)
  }

  // ==================== Buffering ====================

  fn buffer(
    self, size: usize, prefetch: PrefetchStrategy, when_full: BufferingStrategy<Self::Failure>,
  ) -> Buffer<Self>
  where
    Self: Sized,
  {
    Buffer::new(self, size, prefetch, when_full)
  }

  // ==================== Coding ====================

  fn encode<C>(self, encoder: C) -> Encode<Self, C>
  where
    Self: Sized,
    C: TopLevelEncoder,
  {
    Encode::new(self, encoder)
  }

  fn decode<T, C>(self, decoder: C) -> Decode<Self, T, C>
  where
    Self: Sized,
    T: DeserializeOwned,
    C: TopLevelDecoder<Input = Self::Output>,
  {
    Decode::new(self, decoder)
  }

  // ==================== Sharing ====================

  /// Routes one subscription through a subject made by `create_subject`.
  /// Nothing is requested upstream until
  /// [`connect`](ConnectablePublisher::connect).
  fn multicast<J, F>(self, create_subject: F) -> Multicast<Self, J>
  where
    Self: Sized,
    J: Subject<Output = Self::Output, Failure = Self::Failure>,
    F: Fn() -> J + Send + Sync + 'static,
  {
    Multicast::new(self, create_subject)
  }

  /// [`multicast`](Publisher::multicast) through an existing subject.
  fn multicast_subject<J>(self, subject: J) -> Multicast<Self, J>
  where
    Self: Sized,
    J: Subject<Output = Self::Output, Failure = Self::Failure>,
  {
    Multicast::new(self, move || subject.clone())
  }

  fn make_connectable(self) -> MakeConnectable<Self>
  where
    Self: Sized,
    Self::Output: Clone,
    Self::Failure: Clone,
  {
    MakeConnectable::new(self)
  }

  fn share(self) -> Share<Self>
  where
    Self: Sized,
    Self::Output: Clone,
    Self::Failure: Clone,
  {
    Share::new(self)
  }
}

/// A publisher that holds back its upstream until told to connect.
pub trait ConnectablePublisher: Publisher {
  /// Subscribes the upstream if it isn't already. Cancelling or dropping
  /// the handle disconnects it.
  fn connect(&self) -> AnyCancellable;

  /// Connects on the first subscriber and disconnects when the last one
  /// cancels.
  fn autoconnect(self) -> Autoconnect<Self>
  where
    Self: Sized,
  {
    Autoconnect::new(self)
  }
}

// ==================== Factories ====================

/// One value, then finish.
pub fn just<T: Clone + Send + Sync + 'static>(value: T) -> Just<T> { Just::new(value) }

/// Finishes without a value.
pub fn empty<O, E>() -> Empty<O, E> { Empty::new() }

/// Never produces anything, never completes.
pub fn never<O, E>() -> Empty<O, E> { Empty::never() }

pub fn fail<O, E>(error: E) -> Fail<O, E> { Fail::new(error) }

/// The items of `items`, one per unit of demand, then finish. Every
/// subscriber iterates its own clone.
pub fn from_iter<I>(items: I) -> Sequence<I>
where
  I: IntoIterator + Clone,
{
  Sequence::new(items)
}

pub fn result<T, E>(result: Result<T, E>) -> ResultPublisher<T, E> { ResultPublisher::new(result) }

pub fn future<T, E>(attempt: impl FnOnce(Promise<T, E>)) -> FuturePublisher<T, E> { FuturePublisher::new(attempt) }

/// Replays what `record` writes into a [`Recording`].
pub fn record<T, E>(record: impl FnOnce(&mut Recording<T, E>)) -> Record<T, E> { Record::new(record) }
