use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_IDENTIFIER: AtomicU64 = AtomicU64::new(1);

/// A process-unique token used for bookkeeping only: registry keys and
/// "is this still the latest inner subscription" checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CombineIdentifier(u64);

impl CombineIdentifier {
  pub fn new() -> Self {
    CombineIdentifier(NEXT_IDENTIFIER.fetch_add(1, Ordering::Relaxed))
  }

  #[inline]
  pub fn value(&self) -> u64 { self.0 }
}

impl Default for CombineIdentifier {
  fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
  use std::{collections::HashSet, thread};

  use super::*;

  #[test]
  fn unique_across_threads() {
    let handles: Vec<_> = (0..4)
      .map(|_| thread::spawn(|| (0..100).map(|_| CombineIdentifier::new()).collect::<Vec<_>>()))
      .collect();
    let mut seen = HashSet::new();
    for h in handles {
      for id in h.join().unwrap() {
        assert!(seen.insert(id));
      }
    }
    assert_eq!(seen.len(), 400);
  }
}
