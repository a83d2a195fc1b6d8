//! The building blocks every operator is made of.
//!
//! A channel is a subscriber toward its upstream and the subscription toward
//! its downstream. All upstream events are guarded by a
//! [`SubscriptionState`](crate::subscription::SubscriptionState), so
//! duplicate subscriptions, duplicate completions and events after cancel
//! never reach the downstream, no matter how the upstream behaves.
//!
//! | Channel | Used for |
//! |---------|----------|
//! | [`TransformChannel`] | one value in, at most one value out, with optional early completion |
//! | [`AnonymousChannel`] | closure-driven operators that need timers, replacement upstreams or custom demand |
//!
//! Neither channel holds a lock while it calls the downstream or a user
//! closure that may reach back into the same channel.

pub mod anonymous;
pub(crate) mod outbox;
pub mod transform;

pub use anonymous::{AnonymousBuilder, AnonymousChannel};
pub use transform::{Step, Transform, TransformChannel};
