use std::sync::Mutex;

use super::Subject;
use crate::{
  completion::Completion,
  demand::Demand,
  rc::lock,
  subscriber::Subscriber,
  subscription::{Cancellable, SharedSubscription, SubscriptionState},
};

/// Connects one upstream to a subject and can cut it off again.
///
/// Unlike subscribing the subject itself, the subject's own completion is
/// not needed to release the upstream: cancelling this subscriber does.
pub struct SubjectSubscriber<J> {
  subject: J,
  state: Mutex<SubscriptionState>,
}

impl<J> SubjectSubscriber<J> {
  pub fn new(subject: J) -> Self { SubjectSubscriber { subject, state: Mutex::new(SubscriptionState::Pending) } }
}

impl<J: Subject> Subscriber for SubjectSubscriber<J> {
  type Input = J::Output;
  type Failure = J::Failure;

  fn receive_subscription(&self, subscription: SharedSubscription) {
    let accepted = lock(&self.state).receive_subscription(subscription.clone());
    if accepted {
      subscription.request(Demand::UNLIMITED);
    } else {
      subscription.cancel();
    }
  }

  fn receive(&self, input: J::Output) -> Demand {
    if lock(&self.state).is_subscribed_and_not_completed() {
      self.subject.send(input);
    }
    Demand::NONE
  }

  fn receive_completion(&self, completion: Completion<J::Failure>) {
    let live = lock(&self.state).receive_completion(completion.is_finished());
    if live {
      self.subject.send_completion(completion);
    }
  }
}

impl<J> Cancellable for SubjectSubscriber<J> {
  fn cancel(&self) {
    let upstream = lock(&self.state).cancel();
    if let Some(upstream) = upstream {
      upstream.cancel();
    }
  }
}

#[cfg(test)]
mod tests {
  use crate::{
    prelude::*,
    test_util::{Manual, Recorder},
  };

  #[test]
  fn cancellable_bridge() {
    let upstream = Manual::<i32, Never>::new();
    let subject = PassthroughSubject::<i32, Never>::new();
    let rec = Recorder::unlimited();
    subject.subscribe(rec.clone());

    let bridge = upstream.clone().subscribe_subject(subject.clone());
    assert_eq!(upstream.requests(), vec![Demand::UNLIMITED]);
    upstream.send(1);
    drop(bridge);
    upstream.send(2);
    assert_eq!(rec.values(), vec![1]);
    assert_eq!(upstream.cancels(), 1);
    assert!(rec.completions().is_empty());
  }
}
