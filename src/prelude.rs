#[cfg(feature = "tokio-scheduler")]
pub use crate::scheduler::TokioScheduler;
pub use crate::{
  completion::Completion,
  demand::Demand,
  identifier::CombineIdentifier,
  ops::{BufferingStrategy, PrefetchStrategy, TimeGroupingStrategy, TopLevelDecoder, TopLevelEncoder},
  publisher::{self, AnyPublisher, ConnectablePublisher, Promise, Publisher, Recording},
  rc::MutArc,
  scheduler::{ImmediateScheduler, Scheduler, SchedulerTime, TestScheduler, VirtualTime},
  subject::{CurrentValueSubject, PassthroughSubject, Subject},
  subscriber::{AnySubscriber, Assign, Sink, Subscriber},
  subscription::{AnyCancellable, Cancellable, SharedSubscription, Subscription},
  Never,
};
