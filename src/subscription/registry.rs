use smallvec::SmallVec;

use super::Cancellable;

/// A container of live entries keyed by a locally unique id.
///
/// Subjects keep their subscriber conduits here and fan-out operators keep
/// their inner subscriptions here. Ids are never reused, so a stale id held
/// by a finished inner subscriber can never remove a newer entry.
///
/// ```rust
/// use traffic::subscription::Registry;
///
/// let mut entries: Registry<&str> = Registry::default();
/// let a = entries.add("a");
///
/// // Reserve first when the entry needs its own id to be built.
/// let b = entries.reserve_id();
/// entries.insert(b, "b");
///
/// assert_eq!(entries.remove(a), Some("a"));
/// assert_eq!(entries.len(), 1);
/// ```
pub struct Registry<U> {
  next_id: usize,
  items: SmallVec<[(usize, U); 2]>,
}

impl<U> Default for Registry<U> {
  fn default() -> Self { Self { next_id: 0, items: SmallVec::new() } }
}

impl<U> Registry<U> {
  #[inline]
  pub fn new() -> Self { Self::default() }

  /// Add an item and return its id.
  #[inline]
  pub fn add(&mut self, item: U) -> usize {
    let id = self.reserve_id();
    self.items.push((id, item));
    id
  }

  /// Reserve the next id without adding an item.
  #[inline]
  pub fn reserve_id(&mut self) -> usize {
    let id = self.next_id;
    self.next_id += 1;
    id
  }

  /// Insert an item under an id obtained from `reserve_id()`.
  #[inline]
  pub fn insert(&mut self, id: usize, item: U) { self.items.push((id, item)); }

  pub fn remove(&mut self, id: usize) -> Option<U> {
    self
      .items
      .iter()
      .position(|(i, _)| *i == id)
      .map(|pos| self.items.remove(pos).1)
  }

  pub fn get(&self, id: usize) -> Option<&U> {
    self.items.iter().find(|(i, _)| *i == id).map(|(_, item)| item)
  }

  pub fn get_mut(&mut self, id: usize) -> Option<&mut U> {
    self
      .items
      .iter_mut()
      .find(|(i, _)| *i == id)
      .map(|(_, item)| item)
  }

  #[inline]
  pub fn contains(&self, id: usize) -> bool { self.items.iter().any(|(i, _)| *i == id) }

  #[inline]
  pub fn len(&self) -> usize { self.items.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  #[inline]
  pub fn drain(&mut self) -> impl Iterator<Item = U> + '_ {
    self.items.drain(..).map(|(_, item)| item)
  }

  #[inline]
  pub fn iter(&self) -> impl Iterator<Item = &U> { self.items.iter().map(|(_, item)| item) }
}

impl<U: Clone> Registry<U> {
  /// A snapshot of every entry, so callbacks can run without the owner's
  /// lock held.
  pub fn snapshot(&self) -> SmallVec<[U; 2]> { self.iter().cloned().collect() }
}

impl<U: Cancellable> Registry<U> {
  /// Cancel every entry and clear the container.
  pub fn cancel_all(&mut self) {
    for item in self.drain() {
      item.cancel();
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

  struct Counting(Arc<AtomicUsize>);

  impl Cancellable for Counting {
    fn cancel(&self) { self.0.fetch_add(1, Ordering::SeqCst); }
  }

  #[test]
  fn ids_are_not_reused() {
    let mut reg = Registry::new();
    let a = reg.add(1);
    assert_eq!(reg.remove(a), Some(1));
    let b = reg.add(2);
    assert_ne!(a, b);
    assert!(!reg.contains(a));
    assert_eq!(reg.get(b), Some(&2));
  }

  #[test]
  fn cancel_all_drains() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut reg = Registry::new();
    reg.add(Counting(count.clone()));
    reg.add(Counting(count.clone()));
    reg.cancel_all();
    assert!(reg.is_empty());
    assert_eq!(count.load(Ordering::SeqCst), 2);
  }
}
