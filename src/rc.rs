use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared, lockable state.
///
/// Cloning shares the same cell. Locking never panics: a poisoned lock means
/// a user callback panicked while the state was held, and the runtime keeps
/// going with whatever the state was at that moment.
pub struct MutArc<T>(Arc<Mutex<T>>);

impl<T> MutArc<T> {
  pub fn own(t: T) -> Self { Self(Arc::new(Mutex::new(t))) }

  #[inline]
  pub fn rc_deref_mut(&self) -> MutexGuard<'_, T> { lock(&self.0) }

  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }
}

impl<T: Clone> MutArc<T> {
  /// A copy of the current content.
  pub fn get(&self) -> T { self.rc_deref_mut().clone() }
}

impl<T> Clone for MutArc<T> {
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T: Default> Default for MutArc<T> {
  fn default() -> Self { Self::own(T::default()) }
}

/// Poison-tolerant lock used for every internal mutex.
#[inline]
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
