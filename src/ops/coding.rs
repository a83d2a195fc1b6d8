//! Turning values into a coder's container format and back.
//!
//! The coders themselves live outside this crate. Anything that can
//! serialize a `serde` value into some container, a JSON string or a byte
//! buffer for example, can implement [`TopLevelEncoder`]; the reverse
//! direction is [`TopLevelDecoder`]. A coder error fails the stream, so the
//! upstream failure type must be able to hold it: widen it with
//! `set_failure_type` or `map_error` first.

use std::{marker::PhantomData, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};

use crate::{
  channel::{Step, Transform, TransformChannel},
  publisher::Publisher,
  subscriber::Subscriber,
};

/// Serializes whole values into `Output`.
pub trait TopLevelEncoder: Send + Sync + 'static {
  type Output: Send + 'static;
  type Error;

  fn encode<T: Serialize>(&self, value: &T) -> Result<Self::Output, Self::Error>;
}

/// Deserializes whole values out of `Input`.
pub trait TopLevelDecoder: Send + Sync + 'static {
  type Input;
  type Error;

  fn decode<T: DeserializeOwned>(&self, input: &Self::Input) -> Result<T, Self::Error>;
}

pub struct Encode<P, C> {
  upstream: P,
  encoder: Arc<C>,
}

impl<P, C> Encode<P, C> {
  pub(crate) fn new(upstream: P, encoder: C) -> Self { Encode { upstream, encoder: Arc::new(encoder) } }
}

pub struct Decode<P, T, C> {
  upstream: P,
  decoder: Arc<C>,
  _marker: PhantomData<fn() -> T>,
}

impl<P, T, C> Decode<P, T, C> {
  pub(crate) fn new(upstream: P, decoder: C) -> Self {
    Decode { upstream, decoder: Arc::new(decoder), _marker: PhantomData }
  }
}

struct EncodeLogic<C, I, E> {
  encoder: Arc<C>,
  _marker: PhantomData<fn(I) -> E>,
}

impl<C, I, E> Transform for EncodeLogic<C, I, E>
where
  C: TopLevelEncoder,
  I: Serialize + Send + 'static,
  E: From<C::Error> + Send + 'static,
{
  type Input = I;
  type Output = C::Output;
  type Failure = E;

  fn transform(&mut self, input: I) -> Result<Step<C::Output>, E> { Ok(Step::Emit(self.encoder.encode(&input)?)) }
}

struct DecodeLogic<C, T, E> {
  decoder: Arc<C>,
  _marker: PhantomData<fn() -> (T, E)>,
}

impl<C, T, E> Transform for DecodeLogic<C, T, E>
where
  C: TopLevelDecoder,
  C::Input: Send + 'static,
  T: DeserializeOwned + Send + 'static,
  E: From<C::Error> + Send + 'static,
{
  type Input = C::Input;
  type Output = T;
  type Failure = E;

  fn transform(&mut self, input: C::Input) -> Result<Step<T>, E> { Ok(Step::Emit(self.decoder.decode(&input)?)) }
}

impl<P, C> Publisher for Encode<P, C>
where
  P: Publisher,
  P::Output: Serialize,
  P::Failure: From<C::Error>,
  C: TopLevelEncoder,
{
  type Output = C::Output;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = C::Output, Failure = P::Failure>,
  {
    let logic = EncodeLogic { encoder: self.encoder.clone(), _marker: PhantomData };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}

impl<P, T, C> Publisher for Decode<P, T, C>
where
  P: Publisher,
  P::Failure: From<C::Error>,
  C: TopLevelDecoder<Input = P::Output>,
  T: DeserializeOwned + Send + 'static,
{
  type Output = T;
  type Failure = P::Failure;

  fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Input = T, Failure = P::Failure>,
  {
    let logic = DecodeLogic { decoder: self.decoder.clone(), _marker: PhantomData };
    self.upstream.subscribe(TransformChannel::new(logic, subscriber));
  }
}

#[cfg(test)]
mod tests {
  use serde::{de::DeserializeOwned, Deserialize, Serialize};

  use super::{TopLevelDecoder, TopLevelEncoder};
  use crate::{prelude::*, test_util::Recorder};

  #[derive(Debug, Clone, PartialEq, thiserror::Error)]
  enum CodingError {
    #[error("json: {0}")]
    Json(String),
  }

  impl From<serde_json::Error> for CodingError {
    fn from(err: serde_json::Error) -> Self { CodingError::Json(err.to_string()) }
  }

  struct Json;

  impl TopLevelEncoder for Json {
    type Output = String;
    type Error = serde_json::Error;

    fn encode<T: Serialize>(&self, value: &T) -> Result<String, serde_json::Error> { serde_json::to_string(value) }
  }

  impl TopLevelDecoder for Json {
    type Input = String;
    type Error = serde_json::Error;

    fn decode<T: DeserializeOwned>(&self, input: &String) -> Result<T, serde_json::Error> {
      serde_json::from_str(input)
    }
  }

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Point {
    x: i32,
    y: i32,
  }

  #[test]
  fn encodes_values() {
    let rec = Recorder::<String, CodingError>::unlimited();
    publisher::from_iter(vec![Point { x: 1, y: 2 }])
      .set_failure_type::<CodingError>()
      .encode(Json)
      .subscribe(rec.clone());
    assert_eq!(rec.values(), vec![r#"{"x":1,"y":2}"#.to_string()]);
    assert_eq!(rec.completions().len(), 1);
    assert!(rec.completions()[0].is_finished());
  }

  #[test]
  fn decode_failure_ends_the_stream() {
    let rec = Recorder::<Point, CodingError>::unlimited();
    publisher::from_iter(vec![r#"{"x":3,"y":4}"#.to_string(), "nope".to_string(), r#"{"x":5,"y":6}"#.to_string()])
      .set_failure_type::<CodingError>()
      .decode::<Point, _>(Json)
      .subscribe(rec.clone());
    assert_eq!(rec.values(), vec![Point { x: 3, y: 4 }]);
    let completions = rec.completions();
    assert_eq!(completions.len(), 1);
    assert!(matches!(completions[0], Completion::Failure(CodingError::Json(_))));
  }
}
