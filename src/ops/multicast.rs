use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::{
  publisher::{ConnectablePublisher, Publisher},
  rc::lock,
  subject::{PassthroughSubject, Subject, SubjectSubscriber},
  subscriber::Subscriber,
  subscription::{AnyCancellable, Cancellable},
};

struct Shared<J> {
  subject: Option<J>,
  connection: Option<Arc<SubjectSubscriber<J>>>,
}

/// Routes a single upstream subscription through a subject so any number of
/// subscribers see the same values.
///
/// The subject is created on first use, by a subscriber or by
/// [`connect`](ConnectablePublisher::connect). Subscribers attach to the
/// subject straight away; the upstream is only subscribed on `connect`.
/// Cancelling the connection detaches the upstream and forgets the subject,
/// so the next use starts over with a fresh one. Clones share all of this.
pub struct Multicast<P, J> {
  upstream: Arc<P>,
  create_subject: Arc<dyn Fn() -> J + Send + Sync>,
  shared: Arc<Mutex<Shared<J>>>,
}

impl<P, J> Clone for Multicast<P, J> {
  fn clone(&self) -> Self {
    Multicast {
      upstream: self.upstream.clone(),
      create_subject: self.create_subject.clone(),
      shared: self.shared.clone(),
    }
  }
}

impl<P, J: Subject> Multicast<P, J> {
  pub(crate) fn new<F>(upstream: P, create_subject: F) -> Self
  where
    F: Fn() -> J + Send + Sync + 'static,
  {
    Multicast {
      upstream: Arc::new(upstream),
      create_subject: Arc::new(create_subject),
      shared: Arc::new(Mutex::new(Shared { subject: None, connection: None })),
    }
  }

  fn subject(&self, shared: &mut Shared<J>) -> J {
    shared.subject.get_or_insert_with(|| (self.create_subject)()).clone()
  }
}

impl<P, J> Publisher for Multicast<P, J>
where
  P: Publisher,
  J: Subject<Output = P::Output, Failure = P::Failure>,
{
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = P::Failure>,
  {
    let subject = self.subject(&mut lock(&self.shared));
    subject.subscribe(subscriber);
  }
}

impl<P, J> ConnectablePublisher for Multicast<P, J>
where
  P: Publisher + Send + Sync + 'static,
  J: Subject<Output = P::Output, Failure = P::Failure>,
{
  fn connect(&self) -> AnyCancellable {
    let (bridge, fresh) = {
      let mut shared = lock(&self.shared);
      if let Some(bridge) = shared.connection.clone() {
        (bridge, false)
      } else {
        let bridge = Arc::new(SubjectSubscriber::new(self.subject(&mut shared)));
        shared.connection = Some(bridge.clone());
        (bridge, true)
      }
    };
    if fresh {
      debug!("multicast: connecting upstream");
      self.upstream.subscribe(bridge.clone());
    }

    let shared = self.shared.clone();
    AnyCancellable::new(move || {
      {
        let mut shared = lock(&shared);
        if shared.connection.as_ref().is_some_and(|current| Arc::ptr_eq(current, &bridge)) {
          shared.connection = None;
          shared.subject = None;
        }
      }
      bridge.cancel();
    })
  }
}

/// [`Multicast`] through a [`PassthroughSubject`].
pub struct MakeConnectable<P: Publisher> {
  multicast: Multicast<P, PassthroughSubject<P::Output, P::Failure>>,
}

impl<P: Publisher> Clone for MakeConnectable<P> {
  fn clone(&self) -> Self { MakeConnectable { multicast: self.multicast.clone() } }
}

impl<P> MakeConnectable<P>
where
  P: Publisher,
  P::Output: Clone,
  P::Failure: Clone,
{
  pub(crate) fn new(upstream: P) -> Self {
    let subject = PassthroughSubject::new();
    MakeConnectable { multicast: Multicast::new(upstream, move || subject.clone()) }
  }
}

impl<P> Publisher for MakeConnectable<P>
where
  P: Publisher,
  P::Output: Clone,
  P::Failure: Clone,
{
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = P::Failure>,
  {
    self.multicast.subscribe(subscriber)
  }
}

impl<P> ConnectablePublisher for MakeConnectable<P>
where
  P: Publisher + Send + Sync + 'static,
  P::Output: Clone,
  P::Failure: Clone,
{
  fn connect(&self) -> AnyCancellable { self.multicast.connect() }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use crate::{
    prelude::*,
    test_util::{Manual, Recorder},
  };

  #[test]
  fn nothing_flows_before_connect() {
    let upstream = Manual::<i32, Never>::new();
    let multicast = upstream.clone().multicast(PassthroughSubject::new);
    let (a, b) = (Recorder::unlimited(), Recorder::unlimited());
    multicast.subscribe(a.clone());
    multicast.subscribe(b.clone());
    assert_eq!(upstream.subscriber_count(), 0);

    let connection = multicast.connect();
    assert_eq!(upstream.subscriber_count(), 1);
    assert_eq!(upstream.requests(), vec![Demand::UNLIMITED]);
    upstream.send(1);
    upstream.send(2);
    assert_eq!(a.values(), vec![1, 2]);
    assert_eq!(b.values(), vec![1, 2]);

    connection.cancel();
    assert_eq!(upstream.cancels(), 1);
    upstream.send(3);
    assert_eq!(a.values(), vec![1, 2]);
  }

  #[test]
  fn connect_is_idempotent_while_connected() {
    let upstream = Manual::<i32, Never>::new();
    let multicast = upstream.clone().make_connectable();
    let first = multicast.connect();
    let _second = multicast.connect();
    assert_eq!(upstream.subscriber_count(), 1);
    drop(first);
    assert_eq!(upstream.cancels(), 1);
  }

  #[test]
  fn reconnecting_uses_a_fresh_subject() {
    let created = std::sync::Arc::new(AtomicUsize::new(0));
    let c_created = created.clone();
    let multicast = publisher::from_iter(vec![1, 2]).multicast(move || {
      c_created.fetch_add(1, Ordering::SeqCst);
      PassthroughSubject::new()
    });
    let rec = Recorder::unlimited();
    multicast.subscribe(rec.clone());
    let connection = multicast.connect();
    assert_eq!(rec.values(), vec![1, 2]);
    assert_eq!(rec.completions(), vec![Completion::Finished]);

    drop(connection);
    let late = Recorder::unlimited();
    multicast.subscribe(late.clone());
    let _again = multicast.connect();
    assert_eq!(created.load(Ordering::SeqCst), 2);
    assert_eq!(late.values(), vec![1, 2]);
  }

  #[test]
  fn shared_subject_replays_current_value() {
    let subject = CurrentValueSubject::<i32, Never>::new(0);
    let upstream = Manual::<i32, Never>::new();
    let c_subject = subject.clone();
    let multicast = upstream.clone().multicast(move || c_subject.clone());
    let rec = Recorder::unlimited();
    multicast.subscribe(rec.clone());
    let _connection = multicast.connect();
    upstream.send(5);
    assert_eq!(rec.values(), vec![0, 5]);
    assert_eq!(subject.value(), 5);
  }
}
