use std::sync::{Arc, Mutex, Weak};

use tracing::trace;

use crate::{
  channel::outbox::{self, Outbox},
  completion::Completion,
  demand::Demand,
  rc::lock,
  subscriber::Subscriber,
  subscription::{Cancellable, SharedSubscription, Subscription, SubscriptionState},
};

type OnSubscription<C> = Box<dyn Fn(&C, SharedSubscription) + Send + Sync>;
type OnValue<C, I> = Box<dyn Fn(&C, I) -> Demand + Send + Sync>;
type OnCompletion<C, E> = Box<dyn Fn(&C, Completion<E>) + Send + Sync>;
type OnRequest<C> = Box<dyn Fn(&C, Demand) + Send + Sync>;
type OnCancel<C> = Box<dyn Fn(&C) + Send + Sync>;

struct Hooks<C, I, E> {
  on_subscription: Option<OnSubscription<C>>,
  on_value: OnValue<C, I>,
  on_completion: OnCompletion<C, E>,
  on_request: Option<OnRequest<C>>,
  on_cancel: Option<OnCancel<C>>,
}

#[derive(Default)]
struct ChannelState {
  upstream: SubscriptionState,
  /// Requested by downstream and not yet delivered.
  demand: Demand,
  downstream_subscribed: bool,
  terminated: bool,
}

/// A channel whose behavior is supplied as closures.
///
/// Every closure receives the channel itself so it can use the guarded
/// helpers: [`send`](Self::send), [`finish`](Self::finish),
/// [`forward_request`](Self::forward_request) and friends. Upstream events
/// only reach the closures while the upstream edge is live.
///
/// The channel tracks the downstream's outstanding demand. When an operator
/// swaps its upstream with [`detach_upstream`](Self::detach_upstream), the
/// next upstream subscription is asked for that outstanding demand instead
/// of being announced to the downstream a second time.
pub struct AnonymousChannel<I, E, D: Subscriber> {
  me: Weak<Self>,
  state: Mutex<ChannelState>,
  /// Deliveries made through [`enqueue`](Self::enqueue) and
  /// [`enqueue_completion`](Self::enqueue_completion).
  outbox: Mutex<Outbox<D::Input, D::Failure>>,
  downstream: D,
  hooks: Hooks<Self, I, E>,
}

/// Collects the optional closures of an [`AnonymousChannel`].
pub struct AnonymousBuilder<I, E, D: Subscriber> {
  downstream: D,
  hooks: Hooks<AnonymousChannel<I, E, D>, I, E>,
}

impl<I, E, D> AnonymousChannel<I, E, D>
where
  I: Send + 'static,
  E: Send + 'static,
  D: Subscriber,
{
  pub fn builder<V, C>(downstream: D, on_value: V, on_completion: C) -> AnonymousBuilder<I, E, D>
  where
    V: Fn(&Self, I) -> Demand + Send + Sync + 'static,
    C: Fn(&Self, Completion<E>) + Send + Sync + 'static,
  {
    AnonymousBuilder {
      downstream,
      hooks: Hooks {
        on_subscription: None,
        on_value: Box::new(on_value),
        on_completion: Box::new(on_completion),
        on_request: None,
        on_cancel: None,
      },
    }
  }

  #[inline]
  pub fn downstream(&self) -> &D { &self.downstream }

  /// A strong handle to this channel, for scheduled work.
  #[inline]
  pub fn arc(&self) -> Option<Arc<Self>> { self.me.upgrade() }

  /// Hands this channel to the downstream as its subscription, once.
  pub fn forward_subscription(&self) {
    {
      let mut state = lock(&self.state);
      if state.downstream_subscribed {
        return;
      }
      state.downstream_subscribed = true;
    }
    if let Some(me) = self.me.upgrade() {
      self.downstream.receive_subscription(me);
    }
  }

  /// Delivers a value downstream unless the channel is cancelled or has
  /// already completed downstream. Returns the extra demand the downstream
  /// asked for.
  pub fn send(&self, value: D::Input) -> Demand {
    {
      let mut state = lock(&self.state);
      if state.terminated || state.upstream.is_cancelled() {
        trace!("value dropped: anonymous channel is closed");
        return Demand::NONE;
      }
      state.demand -= 1;
    }
    let more = self.downstream.receive(value);
    lock(&self.state).demand += more;
    more
  }

  /// Completes the downstream once. Does not touch the upstream.
  pub fn finish(&self, completion: Completion<D::Failure>) {
    {
      let mut state = lock(&self.state);
      if state.terminated || state.upstream.is_cancelled() {
        return;
      }
      state.terminated = true;
    }
    self.downstream.receive_completion(completion);
  }

  /// Cancels the upstream, then completes the downstream once.
  pub fn terminate(&self, completion: Completion<D::Failure>) {
    let upstream = {
      let mut state = lock(&self.state);
      if state.terminated || state.upstream.is_cancelled() {
        return;
      }
      state.terminated = true;
      state.upstream.terminate(completion.is_finished())
    };
    if let Some(upstream) = upstream {
      upstream.cancel();
    }
    self.downstream.receive_completion(completion);
  }

  /// Like [`send`](Self::send), but callable from several threads at once,
  /// typically scheduler tasks. Values are handed downstream one at a time
  /// in call order, and whatever the downstream asks for in return goes
  /// through the channel's request handling.
  pub fn enqueue(&self, value: D::Input) {
    if self.push(value) {
      self.flush();
    }
  }

  /// The serialized counterpart of [`terminate`](Self::terminate): cancels
  /// a still live upstream and queues the completion behind every value
  /// already enqueued.
  pub fn enqueue_completion(&self, completion: Completion<D::Failure>) {
    if self.push_completion(completion) {
      self.flush();
    }
  }

  /// Queues a value for [`flush`](Self::flush) without delivering it.
  pub fn push(&self, value: D::Input) -> bool {
    {
      let mut state = lock(&self.state);
      if state.terminated || state.upstream.is_cancelled() {
        trace!("value dropped: anonymous channel is closed");
        return false;
      }
      state.demand -= 1;
    }
    lock(&self.outbox).push_value(value)
  }

  /// Queues the completion for [`flush`](Self::flush) and cancels a still
  /// live upstream.
  pub fn push_completion(&self, completion: Completion<D::Failure>) -> bool {
    let upstream = {
      let mut state = lock(&self.state);
      if state.terminated || state.upstream.is_cancelled() {
        return false;
      }
      state.terminated = true;
      state.upstream.terminate(completion.is_finished())
    };
    if let Some(upstream) = upstream {
      upstream.cancel();
    }
    lock(&self.outbox).push_completion(completion)
  }

  /// Delivers everything queued, unless another thread already is.
  /// Demand returned by the downstream counts as a request.
  pub fn flush(&self) {
    if !lock(&self.outbox).begin_drain() {
      return;
    }
    outbox::drain(&self.outbox, |outbox| outbox, &self.downstream, |more| self.request(more));
  }

  /// Records `demand` as outstanding and asks the current upstream for it.
  pub fn forward_request(&self, demand: Demand) {
    let upstream = {
      let mut state = lock(&self.state);
      if state.upstream.is_cancelled() {
        return;
      }
      state.demand += demand;
      state.upstream.subscription()
    };
    if let Some(upstream) = upstream {
      upstream.request(demand);
    }
  }

  /// Asks the current upstream for `demand` without recording it.
  pub fn request_upstream(&self, demand: Demand) {
    let upstream = lock(&self.state).upstream.subscription();
    if let Some(upstream) = upstream {
      upstream.request(demand);
    }
  }

  /// Adds to the outstanding demand without asking upstream.
  pub fn add_demand(&self, demand: Demand) { lock(&self.state).demand += demand; }

  /// The downstream's outstanding demand.
  pub fn demand(&self) -> Demand { lock(&self.state).demand }

  /// Forgets the current upstream so a replacement can be subscribed.
  /// `false` once the channel has been cancelled.
  pub fn detach_upstream(&self) -> bool { lock(&self.state).upstream.detach() }

  pub fn is_cancelled(&self) -> bool { lock(&self.state).upstream.is_cancelled() }

  /// `true` once cancelled or completed downstream.
  pub fn is_closed(&self) -> bool {
    let state = lock(&self.state);
    state.terminated || state.upstream.is_cancelled()
  }

  fn default_subscription(&self, subscription: SharedSubscription) {
    let replay = {
      let state = lock(&self.state);
      state.downstream_subscribed.then_some(state.demand)
    };
    match replay {
      None => self.forward_subscription(),
      Some(demand) if demand > Demand::NONE => subscription.request(demand),
      Some(_) => {}
    }
  }
}

impl<I, E, D: Subscriber> AnonymousBuilder<I, E, D>
where
  I: Send + 'static,
  E: Send + 'static,
{
  /// Replaces the default subscription handling, which announces the
  /// channel to the downstream the first time and replays outstanding
  /// demand to replacement upstreams.
  pub fn on_subscription<F>(mut self, f: F) -> Self
  where
    F: Fn(&AnonymousChannel<I, E, D>, SharedSubscription) + Send + Sync + 'static,
  {
    self.hooks.on_subscription = Some(Box::new(f));
    self
  }

  /// Replaces the default request handling, `forward_request`.
  pub fn on_request<F>(mut self, f: F) -> Self
  where
    F: Fn(&AnonymousChannel<I, E, D>, Demand) + Send + Sync + 'static,
  {
    self.hooks.on_request = Some(Box::new(f));
    self
  }

  /// Runs once, on the first effective cancel, before the upstream is
  /// cancelled.
  pub fn on_cancel<F>(mut self, f: F) -> Self
  where
    F: Fn(&AnonymousChannel<I, E, D>) + Send + Sync + 'static,
  {
    self.hooks.on_cancel = Some(Box::new(f));
    self
  }

  pub fn build(self) -> Arc<AnonymousChannel<I, E, D>> {
    let AnonymousBuilder { downstream, hooks } = self;
    Arc::new_cyclic(|me| AnonymousChannel {
      me: me.clone(),
      state: Mutex::new(ChannelState::default()),
      outbox: Mutex::new(Outbox::default()),
      downstream,
      hooks,
    })
  }
}

impl<I, E, D> Subscriber for AnonymousChannel<I, E, D>
where
  I: Send + 'static,
  E: Send + 'static,
  D: Subscriber,
{
  type Input = I;
  type Failure = E;

  fn receive_subscription(&self, subscription: SharedSubscription) {
    let accepted = lock(&self.state).upstream.receive_subscription(subscription.clone());
    if !accepted {
      subscription.cancel();
      return;
    }
    match &self.hooks.on_subscription {
      Some(f) => f(self, subscription),
      None => self.default_subscription(subscription),
    }
  }

  fn receive(&self, input: I) -> Demand {
    {
      let state = lock(&self.state);
      if state.terminated || !state.upstream.is_subscribed_and_not_completed() {
        trace!("value dropped: anonymous channel is not live");
        return Demand::NONE;
      }
    }
    (self.hooks.on_value)(self, input)
  }

  fn receive_completion(&self, completion: Completion<E>) {
    if !lock(&self.state).upstream.receive_completion(completion.is_finished()) {
      return;
    }
    (self.hooks.on_completion)(self, completion)
  }
}

impl<I, E, D: Subscriber> Cancellable for AnonymousChannel<I, E, D> {
  fn cancel(&self) {
    let upstream = {
      let mut state = lock(&self.state);
      if state.upstream.is_cancelled() {
        return;
      }
      state.upstream.cancel()
    };
    lock(&self.outbox).close();
    if let Some(on_cancel) = &self.hooks.on_cancel {
      on_cancel(self);
    }
    if let Some(upstream) = upstream {
      upstream.cancel();
    }
  }
}

impl<I, E, D> Subscription for AnonymousChannel<I, E, D>
where
  I: Send + 'static,
  E: Send + 'static,
  D: Subscriber,
{
  fn request(&self, demand: Demand) {
    if self.is_cancelled() {
      return;
    }
    match &self.hooks.on_request {
      Some(f) => f(self, demand),
      None => self.forward_request(demand),
    }
  }
}
