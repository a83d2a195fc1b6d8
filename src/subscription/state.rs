use tracing::trace;

use super::SharedSubscription;

/// Whether the upstream of a subscribed edge has already completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InnerCompletion {
  Pending,
  Fulfilled,
  Rejected,
}

/// The life cycle of one pipeline edge, seen from its downstream side.
///
/// `Pending -> Subscribed` happens once, the inner completion moves away
/// from `Pending` once, and `Cancelled` is final. Every transition method
/// returns whether it took effect, so callers can drop the event otherwise.
#[derive(Default)]
pub enum SubscriptionState {
  #[default]
  Pending,
  Subscribed {
    subscription: SharedSubscription,
    completion: InnerCompletion,
  },
  Cancelled,
}

impl SubscriptionState {
  /// Accepts the first subscription. A rejected subscription should be
  /// cancelled by the caller once its lock is released.
  pub fn receive_subscription(&mut self, subscription: SharedSubscription) -> bool {
    match self {
      SubscriptionState::Pending => {
        *self = SubscriptionState::Subscribed {
          subscription,
          completion: InnerCompletion::Pending,
        };
        true
      }
      _ => {
        trace!("subscription rejected: edge already subscribed or cancelled");
        false
      }
    }
  }

  /// Records the upstream completion. `false` for a duplicate completion,
  /// a completion after cancel, or one without a subscription.
  pub fn receive_completion(&mut self, finished: bool) -> bool {
    match self {
      SubscriptionState::Subscribed { completion: completion @ InnerCompletion::Pending, .. } => {
        *completion = if finished { InnerCompletion::Fulfilled } else { InnerCompletion::Rejected };
        true
      }
      _ => {
        trace!("completion dropped: edge is not live");
        false
      }
    }
  }

  #[inline]
  pub fn is_subscribed_and_not_completed(&self) -> bool {
    matches!(
      self,
      SubscriptionState::Subscribed { completion: InnerCompletion::Pending, .. }
    )
  }

  #[inline]
  pub fn is_cancelled(&self) -> bool { matches!(self, SubscriptionState::Cancelled) }

  /// `true` once the upstream completed, whether or not it failed.
  #[inline]
  pub fn is_completed(&self) -> bool {
    matches!(self, SubscriptionState::Subscribed { completion, .. } if *completion != InnerCompletion::Pending)
  }

  /// The upstream subscription while the edge is live, for forwarding a
  /// request.
  pub fn subscription(&self) -> Option<SharedSubscription> {
    match self {
      SubscriptionState::Subscribed { subscription, completion: InnerCompletion::Pending } => {
        Some(subscription.clone())
      }
      _ => {
        trace!("request dropped: edge is not live");
        None
      }
    }
  }

  /// Moves to `Cancelled` and hands back the subscription that must be
  /// cancelled after the caller's lock is released. `None` when the edge
  /// was already cancelled or the upstream already completed.
  pub fn cancel(&mut self) -> Option<SharedSubscription> {
    match std::mem::replace(self, SubscriptionState::Cancelled) {
      SubscriptionState::Subscribed { subscription, completion: InnerCompletion::Pending } => {
        Some(subscription)
      }
      _ => None,
    }
  }

  /// Completes the edge from the downstream side, for operators that stop
  /// early. Hands back the subscription to cancel, if it was still live.
  pub fn terminate(&mut self, finished: bool) -> Option<SharedSubscription> {
    match self {
      SubscriptionState::Subscribed { subscription, completion: completion @ InnerCompletion::Pending } => {
        *completion = if finished { InnerCompletion::Fulfilled } else { InnerCompletion::Rejected };
        Some(subscription.clone())
      }
      _ => None,
    }
  }

  /// Goes back to `Pending` so a replacement upstream can be attached,
  /// unless the edge was cancelled.
  pub fn detach(&mut self) -> bool {
    match self {
      SubscriptionState::Cancelled => false,
      _ => {
        *self = SubscriptionState::Pending;
        true
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use super::*;
  use crate::{demand::Demand, subscription::{Cancellable, Subscription}};

  #[derive(Default)]
  struct Probe(AtomicUsize);

  impl Cancellable for Probe {
    fn cancel(&self) { self.0.fetch_add(1, Ordering::SeqCst); }
  }

  impl Subscription for Probe {
    fn request(&self, _: Demand) {}
  }

  #[test]
  fn subscribes_once() {
    let mut state = SubscriptionState::default();
    assert!(state.receive_subscription(Arc::new(Probe::default())));
    assert!(!state.receive_subscription(Arc::new(Probe::default())));
    assert!(state.is_subscribed_and_not_completed());
  }

  #[test]
  fn completes_once() {
    let mut state = SubscriptionState::default();
    assert!(!state.receive_completion(true));
    state.receive_subscription(Arc::new(Probe::default()));
    assert!(state.receive_completion(false));
    assert!(!state.receive_completion(true));
    assert!(state.is_completed());
    assert!(state.subscription().is_none());
  }

  #[test]
  fn cancel_is_final() {
    let probe = Arc::new(Probe::default());
    let mut state = SubscriptionState::default();
    state.receive_subscription(probe.clone());
    let sub = state.cancel();
    assert!(sub.is_some());
    assert!(state.cancel().is_none());
    assert!(state.is_cancelled());
    assert!(state.subscription().is_none());
    assert!(!state.receive_completion(true));
    assert!(!state.detach());
  }

  #[test]
  fn cancel_before_subscription_rejects_it() {
    let mut state = SubscriptionState::default();
    assert!(state.cancel().is_none());
    assert!(!state.receive_subscription(Arc::new(Probe::default())));
  }

  #[test]
  fn detach_allows_a_new_upstream() {
    let mut state = SubscriptionState::default();
    state.receive_subscription(Arc::new(Probe::default()));
    state.receive_completion(false);
    assert!(state.detach());
    assert!(state.receive_subscription(Arc::new(Probe::default())));
    assert!(state.is_subscribed_and_not_completed());
  }
}
