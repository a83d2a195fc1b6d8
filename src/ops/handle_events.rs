use std::sync::Arc;

use crate::{
  channel::AnonymousChannel,
  completion::Completion,
  demand::Demand,
  publisher::Publisher,
  subscriber::Subscriber,
  subscription::SharedSubscription,
};

type Hook<A> = Option<Arc<dyn Fn(A) + Send + Sync>>;

struct Events<T, E> {
  subscription: Hook<SharedSubscription>,
  output: Option<Arc<dyn Fn(&T) + Send + Sync>>,
  completion: Option<Arc<dyn Fn(&Completion<E>) + Send + Sync>>,
  cancel: Option<Arc<dyn Fn() + Send + Sync>>,
  request: Hook<Demand>,
}

impl<T, E> Clone for Events<T, E> {
  fn clone(&self) -> Self {
    Events {
      subscription: self.subscription.clone(),
      output: self.output.clone(),
      completion: self.completion.clone(),
      cancel: self.cancel.clone(),
      request: self.request.clone(),
    }
  }
}

/// Observes every protocol event without changing the stream.
///
/// Hooks are attached with the builder methods and run before the event is
/// passed on.
///
/// ```rust
/// use traffic::prelude::*;
///
/// let log = MutArc::own(vec![]);
/// let (c1, c2) = (log.clone(), log.clone());
/// let _c = publisher::from_iter(1..=2)
///   .handle_events()
///   .on_output(move |v| c1.rc_deref_mut().push(format!("value {v}")))
///   .on_completion(move |_| c2.rc_deref_mut().push("done".to_string()))
///   .sink_value(|_| {});
/// assert_eq!(log.get(), vec!["value 1", "value 2", "done"]);
/// ```
pub struct HandleEvents<P, T, E> {
  upstream: P,
  events: Events<T, E>,
}

impl<P, T, E> HandleEvents<P, T, E> {
  pub(crate) fn new(upstream: P) -> Self {
    HandleEvents {
      upstream,
      events: Events { subscription: None, output: None, completion: None, cancel: None, request: None },
    }
  }

  pub fn on_subscription(mut self, f: impl Fn(SharedSubscription) + Send + Sync + 'static) -> Self {
    self.events.subscription = Some(Arc::new(f));
    self
  }

  pub fn on_output(mut self, f: impl Fn(&T) + Send + Sync + 'static) -> Self {
    self.events.output = Some(Arc::new(f));
    self
  }

  pub fn on_completion(mut self, f: impl Fn(&Completion<E>) + Send + Sync + 'static) -> Self {
    self.events.completion = Some(Arc::new(f));
    self
  }

  /// Runs once, on the first cancel from downstream.
  pub fn on_cancel(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
    self.events.cancel = Some(Arc::new(f));
    self
  }

  /// Runs on every request from downstream until it cancels.
  pub fn on_request(mut self, f: impl Fn(Demand) + Send + Sync + 'static) -> Self {
    self.events.request = Some(Arc::new(f));
    self
  }
}

impl<P, T, E> Publisher for HandleEvents<P, T, E>
where
  P: Publisher<Output = T, Failure = E>,
  T: Send + 'static,
  E: Send + 'static,
{
  type Output = T;
  type Failure = E;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = T, Failure = E>,
  {
    let Events { subscription, output, completion, cancel, request } = self.events.clone();
    let mut builder = AnonymousChannel::<T, E, S>::builder(
      subscriber,
      move |ch, value| {
        if let Some(f) = &output {
          f(&value);
        }
        ch.send(value)
      },
      move |ch, c| {
        if let Some(f) = &completion {
          f(&c);
        }
        ch.finish(c)
      },
    );
    if let Some(f) = subscription {
      builder = builder.on_subscription(move |ch, sub| {
        f(sub);
        ch.forward_subscription();
      });
    }
    if let Some(f) = request {
      builder = builder.on_request(move |ch, demand| {
        f(demand);
        ch.forward_request(demand);
      });
    }
    if let Some(f) = cancel {
      builder = builder.on_cancel(move |_| f());
    }
    self.upstream.subscribe(builder.build());
  }
}
