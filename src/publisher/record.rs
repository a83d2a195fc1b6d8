use serde::{Deserialize, Serialize};
use tracing::trace;

use super::sequence::Emission;
use crate::{completion::Completion, publisher::Publisher, subscriber::Subscriber};

/// An ordered list of outputs followed by one completion.
///
/// Recordings serialize with serde, so a captured stream can be stored and
/// replayed later through a [`Record`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording<T, E> {
  outputs: Vec<T>,
  completion: Option<Completion<E>>,
}

impl<T, E> Default for Recording<T, E> {
  fn default() -> Self { Recording { outputs: vec![], completion: None } }
}

impl<T, E> Recording<T, E> {
  pub fn new() -> Self { Self::default() }

  /// A finished recording of `outputs`.
  pub fn finished(outputs: Vec<T>) -> Self {
    Recording { outputs, completion: Some(Completion::Finished) }
  }

  /// Appends an output. Ignored once the recording is complete.
  pub fn receive(&mut self, value: T) {
    if self.completion.is_some() {
      trace!("recording is complete, output dropped");
      return;
    }
    self.outputs.push(value);
  }

  /// Completes the recording. Only the first completion counts.
  pub fn receive_completion(&mut self, completion: Completion<E>) {
    if self.completion.is_none() {
      self.completion = Some(completion);
    }
  }

  pub fn outputs(&self) -> &[T] { &self.outputs }

  /// The recorded completion, `None` while still open.
  pub fn completion(&self) -> Option<&Completion<E>> { self.completion.as_ref() }
}

/// Replays a [`Recording`] to every subscriber. An open recording replays
/// as finished.
#[derive(Clone, Debug)]
pub struct Record<T, E> {
  recording: Recording<T, E>,
}

impl<T, E> Record<T, E> {
  /// Builds the recording with a closure.
  pub fn new(record: impl FnOnce(&mut Recording<T, E>)) -> Self {
    let mut recording = Recording::new();
    record(&mut recording);
    Record { recording }
  }

  pub fn recording(&self) -> &Recording<T, E> { &self.recording }
}

impl<T, E> From<Recording<T, E>> for Record<T, E> {
  fn from(recording: Recording<T, E>) -> Self { Record { recording } }
}

impl<T, E> Publisher for Record<T, E>
where
  T: Clone + Send + Sync + 'static,
  E: Clone + Send + Sync + 'static,
{
  type Output = T;
  type Failure = E;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = T, Failure = E>,
  {
    let completion = self.recording.completion.clone().unwrap_or(Completion::Finished);
    Emission::start(self.recording.outputs.clone().into_iter(), completion, subscriber);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{prelude::*, test_util::Recorder};

  #[test]
  fn replays_outputs_then_completion() {
    let record = Record::new(|r| {
      r.receive(1);
      r.receive(2);
      r.receive_completion(Completion::Failure("end".to_string()));
      r.receive(3);
    });
    let rec = Recorder::<i32, String>::unlimited();
    record.subscribe(rec.clone());
    assert_eq!(rec.values(), vec![1, 2]);
    assert_eq!(rec.completions(), vec![Completion::Failure("end".to_string())]);
  }

  #[test]
  fn recording_round_trips_through_json() {
    let mut recording = Recording::<u8, String>::finished(vec![4, 5]);
    recording.receive_completion(Completion::Failure("ignored".into()));
    let json = serde_json::to_value(&recording).unwrap();
    assert_eq!(json, serde_json::json!({ "outputs": [4, 5], "completion": "Finished" }));
    let back: Recording<u8, String> = serde_json::from_value(json).unwrap();
    assert_eq!(back, recording);
  }
}
