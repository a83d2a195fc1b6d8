pub mod autoconnect;
pub mod buffer;
pub mod catch;
pub mod coding;
pub mod collect_by;
pub mod combine_latest;
pub mod comparison;
pub mod concatenate;
pub mod debounce;
pub mod delay;
pub mod drop_while;
mod fan_in;
pub mod filter;
pub mod first;
pub mod flat_map;
pub mod handle_events;
pub mod last;
pub mod map;
pub mod map_error;
pub mod measure_interval;
pub mod merge;
pub mod multicast;
pub mod output;
pub mod prefix_while;
pub mod receive_on;
pub mod reduce;
pub mod remove_duplicates;
pub mod replace;
pub mod retry;
pub mod satisfy;
pub mod scan;
pub mod subscribe_on;
pub mod switch_to_latest;
pub mod throttle;
pub mod timeout;
pub mod until_output;
pub mod values;
pub mod zip;

pub use autoconnect::{Autoconnect, Share};
pub use buffer::{Buffer, BufferingStrategy, PrefetchStrategy};
pub use catch::{Catch, TryCatch};
pub use coding::{Decode, Encode, TopLevelDecoder, TopLevelEncoder};
pub use collect_by::{CollectByCount, CollectByTime, TimeGroupingStrategy};
pub use combine_latest::CombineLatest;
pub use comparison::Comparison;
pub use concatenate::Concatenate;
pub use debounce::Debounce;
pub use delay::Delay;
pub use drop_while::{DropWhile, TryDropWhile};
pub use filter::{CompactMap, Filter, TryCompactMap, TryFilter};
pub use first::{First, FirstWhere, TryFirstWhere};
pub use flat_map::FlatMap;
pub use handle_events::HandleEvents;
pub use last::{Last, LastWhere, TryLastWhere};
pub use map::{Map, TryMap};
pub use map_error::{AssertNoFailure, MapError, SetFailureType};
pub use measure_interval::MeasureInterval;
pub use merge::{Merge, MergeMany};
pub use multicast::{MakeConnectable, Multicast};
pub use output::OutputRange;
pub use prefix_while::{PrefixWhile, TryPrefixWhile};
pub use receive_on::ReceiveOn;
pub use reduce::{Collect, Count, IgnoreOutput, Reduce, TryReduce};
pub use remove_duplicates::{RemoveDuplicates, TryRemoveDuplicates};
pub use replace::{ReplaceEmpty, ReplaceError};
pub use retry::Retry;
pub use satisfy::{AllSatisfy, Contains, ContainsWhere, TryAllSatisfy, TryContainsWhere};
pub use scan::{Scan, TryScan};
pub use subscribe_on::SubscribeOn;
pub use switch_to_latest::SwitchToLatest;
pub use throttle::Throttle;
pub use timeout::Timeout;
pub use until_output::{DropUntilOutput, PrefixUntilOutput};
pub use values::Values;
pub use zip::Zip;

#[cfg(test)]
mod test {
  use crate::{
    prelude::*,
    test_util::{Event, Recorder},
  };

  #[test]
  fn long_chain_keeps_backpressure() {
    let recorder = Recorder::<i32, Never>::with_demand(Demand::max(2), Demand::NONE);
    publisher::from_iter(1..=100)
      .map(|v| v * 3)
      .drop_first(1)
      .scan(0, |acc, v| acc + v)
      .subscribe(recorder.clone());

    assert_eq!(recorder.values(), vec![6, 15]);
    assert!(recorder.completions().is_empty());
    recorder.request(Demand::max(1));
    assert_eq!(recorder.values(), vec![6, 15, 27]);
  }

  #[test]
  fn filtered_values_still_use_up_demand() {
    let recorder = Recorder::<i32, Never>::with_demand(Demand::max(2), Demand::NONE);
    publisher::from_iter(1..=10)
      .filter(|v| v % 2 == 0)
      .subscribe(recorder.clone());

    assert_eq!(recorder.values(), vec![2]);
    recorder.request(Demand::max(2));
    assert_eq!(recorder.values(), vec![2, 4]);
    assert!(recorder.completions().is_empty());
  }

  #[test]
  fn reduce_after_failure_free_chain() {
    let recorder = Recorder::<usize, Never>::unlimited();
    publisher::from_iter(vec!["a", "bb", "ccc"])
      .map(str::len)
      .reduce(0, |acc, len| acc + len)
      .subscribe(recorder.clone());

    assert_eq!(
      recorder.events()[1..].to_vec(),
      vec![Event::Value(6), Event::Completion(Completion::Finished)]
    );
  }
}
