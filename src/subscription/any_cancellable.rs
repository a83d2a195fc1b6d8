use std::{
  fmt,
  hash::{Hash, Hasher},
  sync::Mutex,
};

use super::Cancellable;
use crate::{identifier::CombineIdentifier, rc::lock};

type CancelAction = Box<dyn FnOnce() + Send>;

/// A type-erased cancellation handle.
///
/// The wrapped action runs at most once: on the first call to
/// [`Cancellable::cancel`], or when the handle is dropped without having
/// been cancelled.
///
/// ```rust
/// use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
/// use traffic::prelude::*;
///
/// let runs = Arc::new(AtomicUsize::new(0));
/// let c_runs = runs.clone();
/// let handle = AnyCancellable::new(move || { c_runs.fetch_add(1, Ordering::SeqCst); });
/// drop(handle);
/// assert_eq!(runs.load(Ordering::SeqCst), 1);
/// ```
pub struct AnyCancellable {
  id: CombineIdentifier,
  action: Mutex<Option<CancelAction>>,
}

impl AnyCancellable {
  pub fn new<F>(action: F) -> Self
  where
    F: FnOnce() + Send + 'static,
  {
    Self {
      id: CombineIdentifier::new(),
      action: Mutex::new(Some(Box::new(action))),
    }
  }

  /// Wraps any cancellable value.
  pub fn from_cancellable<C>(cancellable: C) -> Self
  where
    C: Cancellable + Send + 'static,
  {
    Self::new(move || cancellable.cancel())
  }

  /// A handle with nothing to cancel.
  pub fn empty() -> Self {
    Self { id: CombineIdentifier::new(), action: Mutex::new(None) }
  }

  /// `true` once the action has run, or if there never was one.
  pub fn is_cancelled(&self) -> bool { lock(&self.action).is_none() }

  /// Moves the handle into a collection that owns its lifetime.
  pub fn store<C>(self, collection: &mut C)
  where
    C: Extend<AnyCancellable>,
  {
    collection.extend(Some(self));
  }
}

impl Cancellable for AnyCancellable {
  fn cancel(&self) {
    let action = lock(&self.action).take();
    if let Some(action) = action {
      action();
    }
  }
}

impl Drop for AnyCancellable {
  fn drop(&mut self) { self.cancel() }
}

impl PartialEq for AnyCancellable {
  fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

impl Eq for AnyCancellable {}

impl Hash for AnyCancellable {
  fn hash<H: Hasher>(&self, state: &mut H) { self.id.hash(state) }
}

impl fmt::Debug for AnyCancellable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AnyCancellable")
      .field("id", &self.id)
      .field("is_cancelled", &self.is_cancelled())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use std::{
    collections::HashSet,
    sync::{
      atomic::{AtomicUsize, Ordering},
      Arc,
    },
  };

  use super::*;

  fn counting() -> (Arc<AtomicUsize>, AnyCancellable) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    (count, AnyCancellable::new(move || {
      c.fetch_add(1, Ordering::SeqCst);
    }))
  }

  #[test]
  fn cancel_is_idempotent() {
    let (count, handle) = counting();
    handle.cancel();
    handle.cancel();
    assert!(handle.is_cancelled());
    drop(handle);
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn drop_runs_action_once() {
    let (count, handle) = counting();
    drop(handle);
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn store_keeps_it_alive() {
    let (count, handle) = counting();
    let mut bag = Vec::new();
    handle.store(&mut bag);
    assert_eq!(count.load(Ordering::SeqCst), 0);
    bag.clear();
    assert_eq!(count.load(Ordering::SeqCst), 1);

    let (count, handle) = counting();
    let mut set = HashSet::new();
    handle.store(&mut set);
    drop(set);
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }
}
