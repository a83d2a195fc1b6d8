//! Backpressure accounting shared by every subscription edge.
//!
//! A [`Demand`] is either a finite count or unlimited. All arithmetic is
//! total: addition and multiplication saturate to unlimited instead of
//! overflowing, subtraction is clamped at zero.

use std::{
  cmp::Ordering,
  fmt,
  ops::{Add, AddAssign, Mul, MulAssign, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};

/// How many more values a subscriber is willing to receive.
///
/// `Demand` is always added to what is already outstanding, it never
/// replaces it.
///
/// ```rust
/// use traffic::prelude::*;
///
/// let mut demand = Demand::max(2);
/// demand += 3;
/// assert_eq!(demand, Demand::max(5));
/// assert_eq!(demand - Demand::UNLIMITED, Demand::NONE);
/// assert!(Demand::UNLIMITED > Demand::max(usize::MAX));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Demand(Option<usize>);

impl Demand {
  /// No limit on the number of values.
  pub const UNLIMITED: Demand = Demand(None);

  /// No values at all.
  pub const NONE: Demand = Demand(Some(0));

  /// A finite demand of `value` items.
  #[inline]
  pub const fn max(value: usize) -> Self { Demand(Some(value)) }

  #[inline]
  pub const fn is_unlimited(&self) -> bool { self.0.is_none() }

  /// `true` for a finite demand of zero.
  #[inline]
  pub const fn is_none(&self) -> bool { matches!(self.0, Some(0)) }

  /// The finite count, or `None` when unlimited.
  #[inline]
  pub const fn max_value(&self) -> Option<usize> { self.0 }
}

impl Default for Demand {
  fn default() -> Self { Demand::NONE }
}

impl From<usize> for Demand {
  fn from(value: usize) -> Self { Demand::max(value) }
}

impl fmt::Display for Demand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.0 {
      None => f.write_str("unlimited"),
      Some(n) => write!(f, "max({n})"),
    }
  }
}

// ==================== Ordering ====================

impl Ord for Demand {
  fn cmp(&self, other: &Self) -> Ordering {
    match (self.0, other.0) {
      (None, None) => Ordering::Equal,
      (None, Some(_)) => Ordering::Greater,
      (Some(_), None) => Ordering::Less,
      (Some(a), Some(b)) => a.cmp(&b),
    }
  }
}

impl PartialOrd for Demand {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl PartialEq<usize> for Demand {
  fn eq(&self, other: &usize) -> bool { self.0 == Some(*other) }
}

impl PartialOrd<usize> for Demand {
  fn partial_cmp(&self, other: &usize) -> Option<Ordering> {
    Some(self.cmp(&Demand::max(*other)))
  }
}

// ==================== Arithmetic ====================

impl Add for Demand {
  type Output = Demand;

  fn add(self, rhs: Demand) -> Demand {
    match (self.0, rhs.0) {
      (Some(a), Some(b)) => a.checked_add(b).map_or(Demand::UNLIMITED, Demand::max),
      _ => Demand::UNLIMITED,
    }
  }
}

impl Add<usize> for Demand {
  type Output = Demand;

  fn add(self, rhs: usize) -> Demand { self + Demand::max(rhs) }
}

impl Sub for Demand {
  type Output = Demand;

  fn sub(self, rhs: Demand) -> Demand {
    match (self.0, rhs.0) {
      (None, _) => Demand::UNLIMITED,
      (Some(_), None) => Demand::NONE,
      (Some(a), Some(b)) => Demand::max(a.saturating_sub(b)),
    }
  }
}

impl Sub<usize> for Demand {
  type Output = Demand;

  fn sub(self, rhs: usize) -> Demand { self - Demand::max(rhs) }
}

impl Mul<usize> for Demand {
  type Output = Demand;

  fn mul(self, rhs: usize) -> Demand {
    match self.0 {
      None => Demand::UNLIMITED,
      Some(a) => a.checked_mul(rhs).map_or(Demand::UNLIMITED, Demand::max),
    }
  }
}

impl AddAssign for Demand {
  fn add_assign(&mut self, rhs: Demand) { *self = *self + rhs }
}

impl AddAssign<usize> for Demand {
  fn add_assign(&mut self, rhs: usize) { *self = *self + rhs }
}

impl SubAssign for Demand {
  fn sub_assign(&mut self, rhs: Demand) { *self = *self - rhs }
}

impl SubAssign<usize> for Demand {
  fn sub_assign(&mut self, rhs: usize) { *self = *self - rhs }
}

impl MulAssign<usize> for Demand {
  fn mul_assign(&mut self, rhs: usize) { *self = *self * rhs }
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;

  fn demand() -> impl Strategy<Value = Demand> {
    prop_oneof![
      Just(Demand::UNLIMITED),
      Just(Demand::NONE),
      Just(Demand::max(usize::MAX)),
      any::<usize>().prop_map(Demand::max),
      (0usize..64).prop_map(Demand::max),
    ]
  }

  #[test]
  fn display() {
    assert_eq!(Demand::UNLIMITED.to_string(), "unlimited");
    assert_eq!(Demand::max(3).to_string(), "max(3)");
  }

  #[test]
  fn unlimited_is_greatest() {
    assert!(Demand::UNLIMITED > Demand::max(usize::MAX));
    assert!(Demand::NONE < Demand::max(1));
    assert!(Demand::max(2) > 1);
    assert_eq!(Demand::max(2), 2);
  }

  #[test]
  fn assigning_operators() {
    let mut d = Demand::max(1);
    d += Demand::max(2);
    assert_eq!(d, Demand::max(3));
    d -= 5;
    assert_eq!(d, Demand::NONE);
    d += 4;
    d *= 3;
    assert_eq!(d, Demand::max(12));
    d += Demand::UNLIMITED;
    assert!(d.is_unlimited());
  }

  #[test]
  fn serde_is_transparent() {
    assert_eq!(serde_json::to_string(&Demand::max(4)).unwrap(), "4");
    assert_eq!(serde_json::to_string(&Demand::UNLIMITED).unwrap(), "null");
    let back: Demand = serde_json::from_str("7").unwrap();
    assert_eq!(back, Demand::max(7));
  }

  proptest! {
    #[test]
    fn addition_saturates(a in demand(), b in demand()) {
      let sum = a + b;
      match (a.max_value(), b.max_value()) {
        (Some(x), Some(y)) => match x.checked_add(y) {
          Some(s) => prop_assert_eq!(sum, Demand::max(s)),
          None => prop_assert!(sum.is_unlimited()),
        },
        _ => prop_assert!(sum.is_unlimited()),
      }
      prop_assert_eq!(sum, b + a);
    }

    #[test]
    fn subtraction_clamps(a in demand(), b in demand()) {
      let diff = a - b;
      if a.is_unlimited() {
        prop_assert!(diff.is_unlimited());
      } else if b.is_unlimited() {
        prop_assert_eq!(diff, Demand::NONE);
      } else {
        prop_assert!(diff <= a);
        prop_assert_eq!(diff.max_value(), a.max_value().map(|x| x.saturating_sub(b.max_value().unwrap_or(0))));
      }
    }

    #[test]
    fn multiplication_by_zero_is_none(a in any::<usize>()) {
      prop_assert_eq!(Demand::max(a) * 0, Demand::NONE);
    }

    #[test]
    fn multiplication_saturates(a in demand(), m in any::<usize>()) {
      let product = a * m;
      match a.max_value() {
        None => prop_assert!(product.is_unlimited()),
        Some(x) => match x.checked_mul(m) {
          Some(p) => prop_assert_eq!(product, Demand::max(p)),
          None => prop_assert!(product.is_unlimited()),
        },
      }
    }

    #[test]
    fn ordering_matches_finite_values(a in any::<usize>(), b in any::<usize>()) {
      prop_assert_eq!(Demand::max(a).cmp(&Demand::max(b)), a.cmp(&b));
      prop_assert!(Demand::UNLIMITED > Demand::max(a));
    }
  }
}
