//! Pulling a publisher's values with `async`.

use std::{
  collections::VecDeque,
  pin::Pin,
  sync::{Arc, Mutex},
  task::{Context, Poll, Waker},
};

use futures::Stream;

use crate::{
  completion::Completion,
  demand::Demand,
  publisher::Publisher,
  rc::lock,
  subscriber::Subscriber,
  subscription::SharedSubscription,
};

struct StreamState<T, E> {
  queue: VecDeque<Result<T, E>>,
  waker: Option<Waker>,
  subscription: Option<SharedSubscription>,
  /// A request of one is out and unanswered.
  outstanding: bool,
  closed: bool,
}

/// A [`Stream`] over a publisher's values.
///
/// Nothing is requested until the stream is polled, and then only one
/// value at a time. A failure is yielded as the last item; dropping the
/// stream cancels the subscription.
///
/// ```rust
/// use futures::{executor::block_on, StreamExt};
/// use traffic::prelude::*;
///
/// let items: Vec<_> = block_on(publisher::from_iter(1..=3).values().collect());
/// assert_eq!(items, vec![Ok(1), Ok(2), Ok(3)]);
/// ```
pub struct Values<T, E> {
  state: Arc<Mutex<StreamState<T, E>>>,
}

impl<T: Send + 'static, E: Send + 'static> Values<T, E> {
  pub(crate) fn new<P>(publisher: P) -> Self
  where
    P: Publisher<Output = T, Failure = E>,
  {
    let state = Arc::new(Mutex::new(StreamState {
      queue: VecDeque::new(),
      waker: None,
      subscription: None,
      outstanding: false,
      closed: false,
    }));
    publisher.subscribe(StreamSubscriber { state: state.clone() });
    Values { state }
  }
}

impl<T, E> Stream for Values<T, E> {
  type Item = Result<T, E>;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    let ask = {
      let mut state = lock(&self.state);
      if let Some(item) = state.queue.pop_front() {
        return Poll::Ready(Some(item));
      }
      if state.closed {
        return Poll::Ready(None);
      }
      state.waker = Some(cx.waker().clone());
      match state.subscription.clone() {
        Some(subscription) if !state.outstanding => {
          state.outstanding = true;
          Some(subscription)
        }
        _ => None,
      }
    };
    let Some(subscription) = ask else { return Poll::Pending };
    subscription.request(Demand::max(1));

    // Synchronous publishers answer inside `request`.
    let mut state = lock(&self.state);
    match state.queue.pop_front() {
      Some(item) => Poll::Ready(Some(item)),
      None if state.closed => Poll::Ready(None),
      None => Poll::Pending,
    }
  }
}

impl<T, E> Drop for Values<T, E> {
  fn drop(&mut self) {
    let subscription = {
      let mut state = lock(&self.state);
      state.closed = true;
      state.queue.clear();
      state.subscription.take()
    };
    if let Some(subscription) = subscription {
      subscription.cancel();
    }
  }
}

struct StreamSubscriber<T, E> {
  state: Arc<Mutex<StreamState<T, E>>>,
}

impl<T, E> StreamSubscriber<T, E> {
  fn wake(&self, update: impl FnOnce(&mut StreamState<T, E>)) {
    let waker = {
      let mut state = lock(&self.state);
      update(&mut state);
      state.waker.take()
    };
    if let Some(waker) = waker {
      waker.wake();
    }
  }
}

impl<T: Send + 'static, E: Send + 'static> Subscriber for StreamSubscriber<T, E> {
  type Input = T;
  type Failure = E;

  fn receive_subscription(&self, subscription: SharedSubscription) {
    let mut rejected = Some(subscription);
    self.wake(|state| {
      if state.subscription.is_none() && !state.closed {
        state.subscription = rejected.take();
      }
    });
    if let Some(subscription) = rejected {
      subscription.cancel();
    }
  }

  fn receive(&self, input: T) -> Demand {
    self.wake(|state| {
      if !state.closed {
        state.outstanding = false;
        state.queue.push_back(Ok(input));
      }
    });
    Demand::NONE
  }

  fn receive_completion(&self, completion: Completion<E>) {
    self.wake(|state| {
      if state.closed {
        return;
      }
      state.closed = true;
      state.subscription = None;
      if let Completion::Failure(err) = completion {
        state.queue.push_back(Err(err));
      }
    });
  }
}
