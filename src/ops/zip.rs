use std::collections::VecDeque;

use crate::{
  ops::fan_in::{unbox, Aggregate, Boxed, Gather, Slot},
  publisher::Publisher,
  subscriber::Subscriber,
};

/// Pairs up the n-th values of every upstream into tuples.
///
/// Finishes as soon as any upstream has finished and its queue is empty.
#[derive(Clone)]
pub struct Zip<U> {
  upstreams: U,
}

impl<U> Zip<U> {
  pub fn new(upstreams: U) -> Self { Zip { upstreams } }
}

type Combine<T> = Box<dyn Fn(&mut [VecDeque<Boxed>]) -> T + Send>;

struct Queues<T> {
  queues: Vec<VecDeque<Boxed>>,
  combine: Combine<T>,
}

impl<T: Send + 'static> Gather for Queues<T> {
  type Output = T;

  fn put(&mut self, index: usize, value: Boxed) { self.queues[index].push_back(value); }

  fn take(&mut self) -> Option<T> {
    if self.has_ready() {
      Some((self.combine)(&mut self.queues))
    } else {
      None
    }
  }

  fn has_ready(&self) -> bool { self.queues.iter().all(|q| !q.is_empty()) }

  fn is_exhausted(&self, finished: &[bool]) -> bool {
    finished.iter().zip(&self.queues).any(|(f, q)| *f && q.is_empty())
  }

  fn clear(&mut self) { self.queues.iter_mut().for_each(VecDeque::clear); }
}

fn head<T: 'static>(queue: &mut VecDeque<Boxed>) -> T {
  match queue.pop_front() {
    Some(value) => unbox(value),
    None => unreachable!("zipped an empty queue"),
  }
}

macro_rules! impl_zip {
  ($n: expr; $($P: ident $idx: tt),+) => {
    impl<E, $($P),+> Publisher for Zip<($($P,)+)>
    where
      E: Send + 'static,
      $($P: Publisher<Failure = E>,)+
    {
      type Output = ($($P::Output,)+);
      type Failure = E;

      fn subscribe<S>(&self, subscriber: S)
      where
        S: Subscriber<Input = Self::Output, Failure = E>,
      {
        let combine: Combine<Self::Output> =
          Box::new(|queues: &mut [VecDeque<Boxed>]| ($(head::<$P::Output>(&mut queues[$idx]),)+));
        let gather = Queues { queues: (0..$n).map(|_| VecDeque::new()).collect(), combine };
        let aggregate = Aggregate::new(gather, $n, subscriber);
        $(self.upstreams.$idx.subscribe(Slot::<$P::Output, _, _>::new($idx, &aggregate));)+
        aggregate.attached();
      }
    }
  };
}

impl_zip!(2; P0 0, P1 1);
impl_zip!(3; P0 0, P1 1, P2 2);
impl_zip!(4; P0 0, P1 1, P2 2, P3 3);

#[cfg(test)]
mod tests {
  use crate::{
    prelude::*,
    test_util::{Manual, Recorder},
  };

  #[test]
  fn pairs_by_position() {
    let rec = Recorder::unlimited();
    publisher::from_iter(vec![1, 2, 3])
      .zip(publisher::from_iter(vec!["a", "b"]))
      .subscribe(rec.clone());
    assert_eq!(rec.values(), vec![(1, "a"), (2, "b")]);
    assert_eq!(rec.completions(), vec![Completion::Finished]);
  }

  #[test]
  fn buffers_until_every_side_has_a_value() {
    let a = PassthroughSubject::<i32, Never>::new();
    let b = PassthroughSubject::<char, Never>::new();
    let c = PassthroughSubject::<bool, Never>::new();
    let rec = Recorder::unlimited();
    a.clone().zip3(b.clone(), c.clone()).subscribe(rec.clone());

    a.send(1);
    a.send(2);
    b.send('x');
    assert!(rec.values().is_empty());
    c.send(true);
    assert_eq!(rec.values(), vec![(1, 'x', true)]);

    a.send_completion(Completion::Finished);
    assert!(rec.completions().is_empty());
    b.send('y');
    c.send(false);
    assert_eq!(rec.values(), vec![(1, 'x', true), (2, 'y', false)]);
    assert_eq!(rec.completions(), vec![Completion::Finished]);
  }

  #[test]
  fn demand_limits_tuples() {
    let a = Manual::<i32, Never>::new();
    let b = Manual::<i32, Never>::new();
    let rec = Recorder::with_demand(Demand::max(1), Demand::NONE);
    a.clone().zip(b.clone()).subscribe(rec.clone());
    assert_eq!(a.total_requested(), Demand::max(1));
    assert_eq!(b.total_requested(), Demand::max(1));

    a.send(1);
    b.send(2);
    a.send(3);
    b.send(4);
    assert_eq!(rec.values(), vec![(1, 2)]);
    rec.request(Demand::max(1));
    assert_eq!(rec.values(), vec![(1, 2), (3, 4)]);
  }

  #[test]
  fn zip4_and_cancel() {
    let a = Manual::<i32, Never>::new();
    let rec = Recorder::unlimited();
    a.clone()
      .zip4(publisher::just(1), publisher::just(2), publisher::just(3))
      .subscribe(rec.clone());
    a.send(0);
    assert_eq!(rec.values(), vec![(0, 1, 2, 3)]);
    assert_eq!(rec.completions(), vec![Completion::Finished]);
    assert_eq!(a.cancels(), 1);
  }
}
