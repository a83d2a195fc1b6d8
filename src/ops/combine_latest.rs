use crate::{
  ops::fan_in::{Aggregate, Boxed, Gather, Slot},
  publisher::Publisher,
  subscriber::Subscriber,
};

/// Emits a tuple of the latest value from every upstream each time any of
/// them produces, once all of them have produced at least once.
///
/// Without downstream demand the newest tuple is held back and only the
/// most recent one is delivered when demand arrives.
#[derive(Clone)]
pub struct CombineLatest<U> {
  upstreams: U,
}

impl<U> CombineLatest<U> {
  pub fn new(upstreams: U) -> Self { CombineLatest { upstreams } }
}

type Combine<T> = Box<dyn Fn(&[Option<Boxed>]) -> T + Send>;

struct Latest<T> {
  slots: Vec<Option<Boxed>>,
  dirty: bool,
  combine: Combine<T>,
}

impl<T> Latest<T> {
  fn new(slots: usize, combine: Combine<T>) -> Self {
    Latest { slots: (0..slots).map(|_| None).collect(), dirty: false, combine }
  }

  fn is_complete(&self) -> bool { self.slots.iter().all(Option::is_some) }
}

impl<T: Send + 'static> Gather for Latest<T> {
  type Output = T;

  fn put(&mut self, index: usize, value: Boxed) {
    self.slots[index] = Some(value);
    self.dirty = self.is_complete();
  }

  fn take(&mut self) -> Option<T> {
    if !self.dirty {
      return None;
    }
    self.dirty = false;
    Some((self.combine)(&self.slots))
  }

  fn has_ready(&self) -> bool { self.dirty }

  // Done when everyone finished, or when a finished upstream never
  // produced, since no tuple can ever be formed.
  fn is_exhausted(&self, finished: &[bool]) -> bool {
    finished.iter().all(|f| *f)
      || finished.iter().zip(&self.slots).any(|(f, slot)| *f && slot.is_none())
  }

  fn clear(&mut self) {
    self.slots.iter_mut().for_each(|slot| *slot = None);
    self.dirty = false;
  }
}

fn latest<T: Clone + 'static>(slot: &Option<Boxed>) -> T {
  match slot.as_ref().and_then(|value| value.downcast_ref::<T>()) {
    Some(value) => value.clone(),
    None => unreachable!("combined before every slot produced"),
  }
}

macro_rules! impl_combine_latest {
  ($n: expr; $($P: ident $idx: tt),+) => {
    impl<E, $($P),+> Publisher for CombineLatest<($($P,)+)>
    where
      E: Send + 'static,
      $($P: Publisher<Failure = E>, $P::Output: Clone,)+
    {
      type Output = ($($P::Output,)+);
      type Failure = E;

      fn subscribe<S>(&self, subscriber: S)
      where
        S: Subscriber<Input = Self::Output, Failure = E>,
      {
        let combine: Combine<Self::Output> =
          Box::new(|slots: &[Option<Boxed>]| ($(latest::<$P::Output>(&slots[$idx]),)+));
        let aggregate = Aggregate::new(Latest::new($n, combine), $n, subscriber);
        $(self.upstreams.$idx.subscribe(Slot::<$P::Output, _, _>::new($idx, &aggregate));)+
        aggregate.attached();
      }
    }
  };
}

impl_combine_latest!(2; P0 0, P1 1);
impl_combine_latest!(3; P0 0, P1 1, P2 2);
impl_combine_latest!(4; P0 0, P1 1, P2 2, P3 3);

#[cfg(test)]
mod tests {
  use crate::{
    prelude::*,
    test_util::{Manual, Recorder},
  };

  #[test]
  fn waits_for_every_slot_then_re_emits() {
    let a = PassthroughSubject::<i32, Never>::new();
    let b = PassthroughSubject::<&str, Never>::new();
    let rec = Recorder::unlimited();
    a.clone().combine_latest(b.clone()).subscribe(rec.clone());

    a.send(1);
    a.send(2);
    assert!(rec.values().is_empty());
    b.send("x");
    a.send(3);
    b.send("y");
    assert_eq!(rec.values(), vec![(2, "x"), (3, "x"), (3, "y")]);

    a.send_completion(Completion::Finished);
    b.send("z");
    b.send_completion(Completion::Finished);
    assert_eq!(rec.values().last(), Some(&(3, "z")));
    assert_eq!(rec.completions(), vec![Completion::Finished]);
  }

  #[test]
  fn finished_slot_without_value_finishes_early() {
    let a = PassthroughSubject::<i32, Never>::new();
    let rec = Recorder::unlimited();
    a.clone()
      .combine_latest(publisher::empty::<i32, Never>())
      .subscribe(rec.clone());
    assert_eq!(rec.completions(), vec![Completion::Finished]);
    assert_eq!(a.subscriber_count(), 0);
  }

  #[test]
  fn holds_only_the_newest_tuple_without_demand() {
    let a = Manual::<i32, Never>::new();
    let b = Manual::<i32, Never>::new();
    let rec = Recorder::with_demand(Demand::max(1), Demand::NONE);
    a.clone().combine_latest(b.clone()).subscribe(rec.clone());

    a.send(1);
    b.send(1);
    a.send(2);
    a.send(3);
    assert_eq!(rec.values(), vec![(1, 1)]);
    rec.request(Demand::max(5));
    assert_eq!(rec.values(), vec![(1, 1), (3, 1)]);
  }

  #[test]
  fn failure_propagates() {
    let a = PassthroughSubject::<i32, &str>::new();
    let b = PassthroughSubject::<i32, &str>::new();
    let c = PassthroughSubject::<i32, &str>::new();
    let rec = Recorder::unlimited();
    a.clone().combine_latest3(b.clone(), c.clone()).subscribe(rec.clone());
    a.send(1);
    c.send_completion(Completion::Failure("bad"));
    assert_eq!(rec.completions(), vec![Completion::Failure("bad")]);
    assert_eq!(a.subscriber_count(), 0);
    assert_eq!(b.subscriber_count(), 0);
  }
}
