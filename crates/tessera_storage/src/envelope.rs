//! Self-describing value envelope for components and relationship metadata.
//!
//! Values are stored as the MessagePack map `{"value": <value>}` so that a
//! stored nil is distinguishable from an absent key.

use serde::{Deserialize, Serialize};
use tessera_foundation::{Error, Result, Value};

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    value: &'a Value,
}

#[derive(Deserialize)]
struct Envelope {
    value: Value,
}

/// Encodes `value` into its stored form.
///
/// # Errors
///
/// Returns a serialization error if encoding fails.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(&EnvelopeRef { value }).map_err(Error::serialization)
}

/// Decodes a stored envelope.
///
/// # Errors
///
/// Returns a serialization error if `bytes` is not a valid envelope.
pub fn decode(bytes: &[u8]) -> Result<Value> {
    rmp_serde::from_slice::<Envelope>(bytes)
        .map(|envelope| envelope.value)
        .map_err(Error::serialization)
}
