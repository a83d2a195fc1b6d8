use std::sync::Arc;

use tracing::debug;

use crate::{
  channel::AnonymousChannel,
  completion::Completion,
  demand::Demand,
  publisher::Publisher,
  rc::MutArc,
  subscriber::Subscriber,
  subscription::{Cancellable, SharedSubscription, Subscription},
};

/// Replaces a failed upstream with the publisher the handler builds from
/// the failure.
///
/// The downstream keeps the one subscription it already has. The
/// replacement is asked for the demand the downstream still has
/// outstanding, and later requests and cancels are routed to it.
pub struct Catch<P, F> {
  upstream: P,
  handler: Arc<F>,
}

/// Like [`Catch`], but the handler may itself fail, which ends the stream.
pub struct TryCatch<P, F> {
  upstream: P,
  handler: Arc<F>,
}

impl<P, F> Catch<P, F> {
  pub(crate) fn new(upstream: P, handler: F) -> Self { Catch { upstream, handler: Arc::new(handler) } }
}

impl<P, F> TryCatch<P, F> {
  pub(crate) fn new(upstream: P, handler: F) -> Self { TryCatch { upstream, handler: Arc::new(handler) } }
}

type Slot = MutArc<Option<SharedSubscription>>;

/// Feeds the replacement publisher into the channel's downstream.
struct Relay<I, E, D: Subscriber> {
  outer: Arc<AnonymousChannel<I, E, D>>,
  slot: Slot,
}

impl<I, E, D> Subscriber for Relay<I, E, D>
where
  I: Send + 'static,
  E: Send + 'static,
  D: Subscriber,
{
  type Input = D::Input;
  type Failure = D::Failure;

  fn receive_subscription(&self, subscription: SharedSubscription) {
    let rejected = {
      let mut slot = self.slot.rc_deref_mut();
      let rejected = slot.is_some() || self.outer.is_closed();
      if !rejected {
        *slot = Some(subscription.clone());
      }
      rejected
    };
    if rejected {
      subscription.cancel();
      return;
    }
    let demand = self.outer.demand();
    if demand > Demand::NONE {
      subscription.request(demand);
    }
  }

  fn receive(&self, input: D::Input) -> Demand { self.outer.send(input) }

  fn receive_completion(&self, completion: Completion<D::Failure>) {
    self.slot.rc_deref_mut().take();
    self.outer.finish(completion);
  }
}

fn switch_to<I, E, D, Q>(ch: &AnonymousChannel<I, E, D>, slot: &Slot, replacement: Q)
where
  I: Send + 'static,
  E: Send + 'static,
  D: Subscriber,
  Q: Publisher<Output = D::Input, Failure = D::Failure>,
{
  if let Some(outer) = ch.arc() {
    debug!("catch: subscribing replacement publisher");
    replacement.subscribe(Relay { outer, slot: slot.clone() });
  }
}

fn attach<I, E, D>(
  subscriber: D, slot: &Slot,
  on_completion: impl Fn(&AnonymousChannel<I, E, D>, Completion<E>) + Send + Sync + 'static,
) -> Arc<AnonymousChannel<I, E, D>>
where
  I: Send + 'static,
  E: Send + 'static,
  D: Subscriber<Input = I>,
{
  let (on_request, on_cancel) = (slot.clone(), slot.clone());
  AnonymousChannel::<I, E, D>::builder(subscriber, |ch, value| ch.send(value), on_completion)
    .on_request(move |ch, demand| {
      ch.forward_request(demand);
      let replacement = on_request.rc_deref_mut().clone();
      if let Some(replacement) = replacement {
        replacement.request(demand);
      }
    })
    .on_cancel(move |_| {
      let replacement = on_cancel.rc_deref_mut().take();
      if let Some(replacement) = replacement {
        replacement.cancel();
      }
    })
    .build()
}

impl<P, F, Q> Publisher for Catch<P, F>
where
  P: Publisher,
  F: Fn(P::Failure) -> Q + Send + Sync + 'static,
  Q: Publisher<Output = P::Output>,
{
  type Output = P::Output;
  type Failure = Q::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = Q::Failure>,
  {
    let handler = self.handler.clone();
    let slot = MutArc::own(None);
    let c_slot = slot.clone();
    let channel = attach::<P::Output, P::Failure, S>(subscriber, &slot, move |ch, completion| match completion {
      Completion::Finished => ch.finish(Completion::Finished),
      Completion::Failure(e) => switch_to(ch, &c_slot, handler(e)),
    });
    self.upstream.subscribe(channel);
  }
}

impl<P, F, Q, E> Publisher for TryCatch<P, F>
where
  P: Publisher,
  F: Fn(P::Failure) -> Result<Q, E> + Send + Sync + 'static,
  Q: Publisher<Output = P::Output, Failure = E>,
  E: Send + 'static,
{
  type Output = P::Output;
  type Failure = E;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = P::Output, Failure = E>,
  {
    let handler = self.handler.clone();
    let slot = MutArc::own(None);
    let c_slot = slot.clone();
    let channel = attach::<P::Output, P::Failure, S>(subscriber, &slot, move |ch, completion| match completion {
      Completion::Finished => ch.finish(Completion::Finished),
      Completion::Failure(e) => match handler(e) {
        Ok(replacement) => switch_to(ch, &c_slot, replacement),
        Err(e) => ch.finish(Completion::Failure(e)),
      },
    });
    self.upstream.subscribe(channel);
  }
}

#[cfg(test)]
mod tests {
  use crate::{
    prelude::*,
    test_util::{Manual, Recorder},
  };

  #[test]
  fn failure_switches_to_replacement() {
    let upstream = Manual::<i32, &'static str>::new();
    let rec = Recorder::<i32, Never>::unlimited();
    upstream.clone().catch(|_| publisher::from_iter(vec![10, 11])).subscribe(rec.clone());
    upstream.send(1);
    upstream.complete(Completion::Failure("bad"));
    upstream.send(2);
    assert_eq!(rec.values(), vec![1, 10, 11]);
    assert_eq!(rec.completions(), vec![Completion::Finished]);
    assert_eq!(rec.subscriptions(), 1);
  }

  #[test]
  fn replacement_honors_outstanding_demand() {
    let upstream = Manual::<i32, &'static str>::new();
    let rec = Recorder::<i32, Never>::with_demand(Demand::max(2), Demand::NONE);
    upstream.clone().catch(|_| publisher::from_iter(100..)).subscribe(rec.clone());
    upstream.send(1);
    upstream.complete(Completion::Failure("bad"));
    assert_eq!(rec.values(), vec![1, 100]);
    rec.request(Demand::max(2));
    assert_eq!(rec.values(), vec![1, 100, 101, 102]);
    rec.cancel();
    assert!(rec.completions().is_empty());
  }

  #[test]
  fn try_catch_handler_failure_ends_stream() {
    let rec = Recorder::<i32, String>::unlimited();
    publisher::fail::<i32, _>(7)
      .try_catch(|code| Err::<publisher::Fail<i32, String>, _>(format!("unrecoverable {code}")))
      .subscribe(rec.clone());
    assert_eq!(rec.completions(), vec![Completion::Failure("unrecoverable 7".to_string())]);
  }
}
