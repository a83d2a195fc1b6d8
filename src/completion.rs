use serde::{Deserialize, Serialize};

/// The terminal signal of a value sequence.
///
/// Exactly one completion is delivered per subscription edge, after which
/// the edge is inert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Completion<E> {
  Finished,
  Failure(E),
}

impl<E> Completion<E> {
  #[inline]
  pub fn is_finished(&self) -> bool { matches!(self, Completion::Finished) }

  #[inline]
  pub fn is_failure(&self) -> bool { matches!(self, Completion::Failure(_)) }

  /// The failure payload, if any.
  pub fn failure(self) -> Option<E> {
    match self {
      Completion::Finished => None,
      Completion::Failure(e) => Some(e),
    }
  }

  pub fn as_ref(&self) -> Completion<&E> {
    match self {
      Completion::Finished => Completion::Finished,
      Completion::Failure(e) => Completion::Failure(e),
    }
  }

  pub fn map_failure<E2>(self, f: impl FnOnce(E) -> E2) -> Completion<E2> {
    match self {
      Completion::Finished => Completion::Finished,
      Completion::Failure(e) => Completion::Failure(f(e)),
    }
  }

  pub fn into_result(self) -> Result<(), E> {
    match self {
      Completion::Finished => Ok(()),
      Completion::Failure(e) => Err(e),
    }
  }
}

impl<E> From<Result<(), E>> for Completion<E> {
  fn from(result: Result<(), E>) -> Self {
    match result {
      Ok(()) => Completion::Finished,
      Err(e) => Completion::Failure(e),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accessors() {
    let done: Completion<&str> = Completion::Finished;
    assert!(done.is_finished());
    assert_eq!(done.failure(), None);

    let failed = Completion::Failure("boom");
    assert!(failed.is_failure());
    assert_eq!(failed.map_failure(str::len), Completion::Failure(4));
    assert_eq!(failed.into_result(), Err("boom"));
  }

  #[test]
  fn serde_shape() {
    let json = serde_json::to_string(&Completion::Failure(3)).unwrap();
    assert_eq!(json, r#"{"Failure":3}"#);
    let back: Completion<i32> = serde_json::from_str(r#""Finished""#).unwrap();
    assert_eq!(back, Completion::Finished);
  }
}
