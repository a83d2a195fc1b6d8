use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc, Mutex,
};

use tracing::debug;

use crate::{
  channel::AnonymousChannel,
  ops::multicast::MakeConnectable,
  publisher::{ConnectablePublisher, Publisher},
  rc::lock,
  subscriber::Subscriber,
  subscription::AnyCancellable,
};

#[derive(Default)]
struct RefCount {
  count: usize,
  connecting: bool,
  connection: Option<AnyCancellable>,
}

struct Inner<C> {
  upstream: C,
  state: Mutex<RefCount>,
}

impl<C: ConnectablePublisher> Inner<C> {
  fn ensure_connected(&self) {
    {
      let mut state = lock(&self.state);
      if state.count == 0 || state.connecting || state.connection.is_some() {
        return;
      }
      state.connecting = true;
    }
    debug!("autoconnect: first subscriber, connecting");
    let connection = self.upstream.connect();
    let stale = {
      let mut state = lock(&self.state);
      state.connecting = false;
      if state.count > 0 {
        state.connection = Some(connection);
        None
      } else {
        Some(connection)
      }
    };
    // Everyone left while connecting.
    drop(stale);
  }

  fn release(&self) {
    let connection = {
      let mut state = lock(&self.state);
      state.count = state.count.saturating_sub(1);
      if state.count == 0 {
        state.connection.take()
      } else {
        None
      }
    };
    if connection.is_some() {
      debug!("autoconnect: last subscriber gone, disconnecting");
    }
    drop(connection);
  }
}

/// Connects the upstream connectable when the first subscriber arrives and
/// disconnects it when the last one cancels. Clones share the count.
pub struct Autoconnect<C> {
  inner: Arc<Inner<C>>,
}

impl<C> Clone for Autoconnect<C> {
  fn clone(&self) -> Self { Autoconnect { inner: self.inner.clone() } }
}

impl<C> Autoconnect<C> {
  pub(crate) fn new(upstream: C) -> Self {
    Autoconnect { inner: Arc::new(Inner { upstream, state: Mutex::default() }) }
  }

  /// Subscribers currently holding the connection open.
  pub fn subscriber_count(&self) -> usize { lock(&self.inner.state).count }
}

impl<C> Publisher for Autoconnect<C>
where
  C: ConnectablePublisher + Send + Sync + 'static,
{
  type Output = C::Output;
  type Failure = C::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = C::Output, Failure = C::Failure>,
  {
    lock(&self.inner.state).count += 1;
    let counted = Arc::new(AtomicBool::new(true));
    let inner = self.inner.clone();
    let c_counted = counted.clone();
    let channel = AnonymousChannel::<C::Output, C::Failure, S>::builder(
      subscriber,
      |ch, value| ch.send(value),
      |ch, completion| ch.finish(completion),
    )
    .on_cancel(move |_| {
      if c_counted.swap(false, Ordering::SeqCst) {
        inner.release();
      }
    })
    .build();
    self.inner.upstream.subscribe(channel);
    if counted.load(Ordering::SeqCst) {
      self.inner.ensure_connected();
    }
  }
}

/// One shared subscription to the upstream for every subscriber, connected
/// while anyone is listening. Clones are the same instance.
///
/// ```rust
/// use traffic::prelude::*;
///
/// let subject = PassthroughSubject::<i32, Never>::new();
/// let shared = subject.clone().map(|v| v * 10).share();
/// let seen = MutArc::own(vec![]);
/// let (c_a, c_b) = (seen.clone(), seen.clone());
/// let _a = shared.clone().sink_value(move |v| c_a.rc_deref_mut().push(v));
/// let _b = shared.sink_value(move |v| c_b.rc_deref_mut().push(v));
/// subject.send(1);
/// assert_eq!(seen.get(), vec![10, 10]);
/// ```
pub struct Share<P: Publisher> {
  publisher: Autoconnect<MakeConnectable<P>>,
}

impl<P: Publisher> Clone for Share<P> {
  fn clone(&self) -> Self { Share { publisher: self.publisher.clone() } }
}

impl<P> Share<P>
where
  P: Publisher,
  P::Output: Clone,
  P::Failure: Clone,
{
  pub(crate) fn new(upstream: P) -> Self { Share { publisher: Autoconnect::new(MakeConnectable::new(upstream)) } }
}

impl<P> Publisher for Share<P>
where
  P: Publisher + Send + Sync + 'static,
  P::Output: Clone,
  P::Failure: Clone,
{
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = P::Failure>,
  {
    self.publisher.subscribe(subscriber)
  }
}

#[cfg(test)]
mod tests {
  use crate::{
    prelude::*,
    test_util::{Manual, Recorder},
  };

  #[test]
  fn connects_on_first_and_disconnects_on_last() {
    let upstream = Manual::<i32, Never>::new();
    let auto = upstream.clone().make_connectable().autoconnect();
    assert_eq!(upstream.subscriber_count(), 0);

    let (a, b) = (Recorder::unlimited(), Recorder::unlimited());
    auto.subscribe(a.clone());
    assert_eq!(upstream.subscriber_count(), 1);
    auto.subscribe(b.clone());
    assert_eq!(upstream.subscriber_count(), 1);
    assert_eq!(auto.subscriber_count(), 2);

    upstream.send(7);
    assert_eq!(a.values(), vec![7]);
    assert_eq!(b.values(), vec![7]);

    a.cancel();
    assert_eq!(upstream.cancels(), 0);
    b.cancel();
    assert_eq!(upstream.cancels(), 1);
    assert_eq!(auto.subscriber_count(), 0);
  }

  #[test]
  fn share_runs_upstream_once() {
    let subscriptions = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let c_subscriptions = subscriptions.clone();
    let upstream = Manual::<i32, Never>::new();
    let shared = upstream
      .clone()
      .handle_events()
      .on_subscription(move |_| {
        c_subscriptions.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
      })
      .share();

    let (a, b) = (Recorder::unlimited(), Recorder::unlimited());
    shared.subscribe(a.clone());
    shared.clone().subscribe(b.clone());
    upstream.send(1);
    upstream.complete(Completion::Finished);

    assert_eq!(subscriptions.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(a.values(), vec![1]);
    assert_eq!(b.events(), a.events());
  }

  #[test]
  fn first_subscriber_sees_synchronous_values() {
    let rec = Recorder::unlimited();
    publisher::from_iter(vec![1, 2, 3]).share().subscribe(rec.clone());
    assert_eq!(rec.values(), vec![1, 2, 3]);
    assert_eq!(rec.completions(), vec![Completion::Finished]);
  }
}
