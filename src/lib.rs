//! # traffic: demand-driven reactive streams
//!
//! Publishers produce values, subscribers consume them, and a subscription
//! sits between the two carrying *demand*: a publisher never sends more
//! than its subscriber asked for.
//!
//! ## Quick Start
//!
//! ```rust
//! use traffic::prelude::*;
//!
//! let subject = PassthroughSubject::<i32, Never>::new();
//! let totals = MutArc::own(vec![]);
//! let c_totals = totals.clone();
//! let _c = subject
//!   .clone()
//!   .scan(0, |acc, v| acc + v)
//!   .sink_value(move |v| c_totals.rc_deref_mut().push(v));
//!
//! subject.send(1);
//! subject.send(2);
//! subject.send(3);
//! assert_eq!(totals.get(), vec![1, 3, 6]);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Publisher`] | Produces values on demand; every operator is a method on it |
//! | [`Subscriber`] | Receives a subscription, values and one completion |
//! | [`Subscription`] | Carries demand upstream and cancellation |
//! | [`Demand`] | How many more values a subscriber will take |
//! | [`Subject`] | A publisher you push values into |
//! | [`Scheduler`] | Where time-based operators run their work |
//!
//! ## Feature Flags
//!
//! - **`tokio-scheduler`**: a [`Scheduler`] backed by a tokio runtime.
//!
//! [`Publisher`]: publisher::Publisher
//! [`Subscriber`]: subscriber::Subscriber
//! [`Subscription`]: subscription::Subscription
//! [`Demand`]: demand::Demand
//! [`Subject`]: subject::Subject
//! [`Scheduler`]: scheduler::Scheduler

pub mod channel;
pub mod completion;
pub mod demand;
pub mod identifier;
pub mod ops;
pub mod prelude;
pub mod publisher;
pub mod rc;
pub mod scheduler;
pub mod subject;
pub mod subscriber;
pub mod subscription;

#[cfg(test)]
mod test_util;

pub use prelude::*;

/// The failure type of publishers that cannot fail.
pub type Never = std::convert::Infallible;

#[cfg(doctest)]
mod __markdown_doctests {
  mod readme {
    #![doc = include_str!("../README.md")]
  }
}
