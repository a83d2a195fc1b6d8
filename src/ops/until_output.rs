//! Operators gated by a second publisher: `prefix_until_output` and
//! `drop_until_output`.

use std::{
  marker::PhantomData,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
};

use crate::{
  channel::AnonymousChannel,
  completion::Completion,
  demand::Demand,
  publisher::Publisher,
  rc::MutArc,
  subscriber::Subscriber,
  subscription::{Cancellable, SharedSubscription, Subscription},
};

/// Republishes values until `trigger` produces its first value, then
/// finishes and cancels both. The trigger finishing or failing changes
/// nothing.
#[derive(Clone)]
pub struct PrefixUntilOutput<P, Q> {
  upstream: P,
  trigger: Q,
}

/// Drops values until `trigger` produces its first value, then republishes
/// the rest. A trigger failure fails the stream.
#[derive(Clone)]
pub struct DropUntilOutput<P, Q> {
  upstream: P,
  trigger: Q,
}

impl<P, Q> PrefixUntilOutput<P, Q> {
  pub(crate) fn new(upstream: P, trigger: Q) -> Self { PrefixUntilOutput { upstream, trigger } }
}

impl<P, Q> DropUntilOutput<P, Q> {
  pub(crate) fn new(upstream: P, trigger: Q) -> Self { DropUntilOutput { upstream, trigger } }
}

type Slot = MutArc<Option<SharedSubscription>>;

fn cancel_slot(slot: &Slot) {
  let subscription = slot.rc_deref_mut().take();
  if let Some(subscription) = subscription {
    subscription.cancel();
  }
}

/// Watches the trigger publisher for its first value.
struct Trigger<T, E, F, C> {
  slot: Slot,
  fired: Arc<AtomicBool>,
  on_fire: F,
  on_completion: C,
  _marker: PhantomData<fn(T) -> E>,
}

impl<T, E, F, C> Subscriber for Trigger<T, E, F, C>
where
  T: Send + 'static,
  E: Send + 'static,
  F: Fn() + Send + Sync + 'static,
  C: Fn(Completion<E>) + Send + Sync + 'static,
{
  type Input = T;
  type Failure = E;

  fn receive_subscription(&self, subscription: SharedSubscription) {
    let rejected = {
      let mut slot = self.slot.rc_deref_mut();
      let rejected = slot.is_some() || self.fired.load(Ordering::SeqCst);
      if !rejected {
        *slot = Some(subscription.clone());
      }
      rejected
    };
    if rejected {
      subscription.cancel();
    } else {
      subscription.request(Demand::max(1));
    }
  }

  fn receive(&self, _: T) -> Demand {
    if !self.fired.swap(true, Ordering::SeqCst) {
      cancel_slot(&self.slot);
      (self.on_fire)();
    }
    Demand::NONE
  }

  fn receive_completion(&self, completion: Completion<E>) {
    self.slot.rc_deref_mut().take();
    if !self.fired.load(Ordering::SeqCst) {
      (self.on_completion)(completion);
    }
  }
}

impl<P, Q> Publisher for PrefixUntilOutput<P, Q>
where
  P: Publisher,
  Q: Publisher,
{
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = P::Failure>,
  {
    let slot: Slot = MutArc::own(None);
    let (on_completion, on_cancel) = (slot.clone(), slot.clone());
    let channel = AnonymousChannel::<P::Output, P::Failure, S>::builder(
      subscriber,
      |ch, value| ch.send(value),
      move |ch, completion| {
        cancel_slot(&on_completion);
        ch.finish(completion);
      },
    )
    .on_cancel(move |_| cancel_slot(&on_cancel))
    .build();
    self.upstream.subscribe(channel.clone());

    let fired = Arc::new(AtomicBool::new(false));
    self.trigger.subscribe(Trigger {
      slot,
      fired,
      on_fire: move || channel.terminate(Completion::Finished),
      on_completion: |_: Completion<Q::Failure>| {},
      _marker: PhantomData,
    });
  }
}

impl<P, Q> Publisher for DropUntilOutput<P, Q>
where
  P: Publisher,
  Q: Publisher<Failure = P::Failure>,
{
  type Output = P::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = P::Failure>,
  {
    let slot: Slot = MutArc::own(None);
    let fired = Arc::new(AtomicBool::new(false));
    let (on_completion, on_cancel) = (slot.clone(), slot.clone());
    let open = fired.clone();
    let channel = AnonymousChannel::<P::Output, P::Failure, S>::builder(
      subscriber,
      move |ch, value| if open.load(Ordering::SeqCst) { ch.send(value) } else { Demand::max(1) },
      move |ch, completion| {
        cancel_slot(&on_completion);
        ch.finish(completion);
      },
    )
    .on_cancel(move |_| cancel_slot(&on_cancel))
    .build();
    self.upstream.subscribe(channel.clone());

    self.trigger.subscribe(Trigger {
      slot,
      fired,
      on_fire: || {},
      on_completion: move |completion: Completion<P::Failure>| {
        if completion.is_failure() {
          channel.terminate(completion);
        }
      },
      _marker: PhantomData,
    });
  }
}
