//! Lossless JSON records with open-ended extra attributes.
//!
//! Redmine lets admins and plugins attach arbitrary attributes to a payload.
//! A record type that wants to keep them declares its known keys as a
//! literal list and composes the helpers here:
//!
//! - [`decode_known`] reads the fixed schema out of the raw object,
//! - [`decode_extra`] keeps whatever is left once the known keys are removed,
//! - [`merge_known`] puts the extras back under the known fields on output.
//!
//! Known keys always win a collision on output. A record whose extension bag
//! holds a known key name therefore does not survive an encode/decode round
//! trip unchanged; the extra value is dropped in favour of the known field.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Attributes present in a payload that are not part of the fixed schema.
pub type ExtensionBag = Map<String, Value>;

/// A record with a fixed set of externally named attributes.
pub trait KnownSchema: Serialize + DeserializeOwned {
    /// Every external key name the schema owns, including override keys it
    /// may emit on output.
    const KNOWN_KEYS: &'static [&'static str];

    /// Adjust the serialized known fields before extras are merged in.
    fn finish_encoding(&self, _known: &mut Map<String, Value>) {}
}

/// Deserialize the known-schema half of a raw payload.
pub fn decode_known<T: KnownSchema>(raw: &Value) -> serde_json::Result<T> {
    T::deserialize(raw)
}

/// Strip every known key from a raw payload, returning the remainder.
///
/// Anything other than a JSON object has no extra attributes.
pub fn decode_extra(raw: Value, known_keys: &[&str]) -> ExtensionBag {
    match raw {
        Value::Object(mut map) => {
            for key in known_keys {
                map.remove(*key);
            }
            map
        }
        _ => ExtensionBag::new(),
    }
}

/// Serialize the known fields and lay them over the extension bag.
pub fn merge_known<T: KnownSchema>(
    known: &T,
    extra: &ExtensionBag,
) -> serde_json::Result<Map<String, Value>> {
    let mut fields = match serde_json::to_value(known)? {
        Value::Object(map) => map,
        other => {
            return Err(serde::ser::Error::custom(format!(
                "known fields must serialize to an object, got {}",
                other
            )))
        }
    };
    known.finish_encoding(&mut fields);

    let mut merged = extra.clone();
    merged.extend(fields);
    Ok(merged)
}

/// Decode a raw payload into its known half and extension bag.
///
/// Fails if the payload is not a JSON object or the known fields do not fit
/// the schema.
pub fn decode<T: KnownSchema>(raw: Value) -> serde_json::Result<(T, ExtensionBag)> {
    if !raw.is_object() {
        return Err(serde::de::Error::custom("expected a JSON object"));
    }
    let known = decode_known(&raw)?;
    let extra = decode_extra(raw, T::KNOWN_KEYS);
    Ok((known, extra))
}
