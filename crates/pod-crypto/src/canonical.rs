//! Canonical JSON: keys sorted at every depth, every string and key in
//! Unicode NFC, UTF-8, no insignificant whitespace. The same logical record
//! always encodes to the same bytes.

use serde_json::{Map, Value};
use unicode_normalization::{is_nfc, UnicodeNormalization};

use crate::hasher::HasherError;

/// Encode a value as canonical JSON bytes.
pub fn canonical_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HasherError> {
    let value = serde_json::to_value(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
    serde_json::to_vec(&canonicalize(value)).map_err(|e| HasherError::Serialization(e.to_string()))
}

/// Rebuild a JSON value with NFC strings and object keys in sorted order.
///
/// Independent of whether `serde_json` was built with `preserve_order`.
/// Keys that only differ before normalization collapse into one; the value
/// of the last one in sorted order is kept.
pub fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> =
                map.into_iter().map(|(k, v)| (nfc(k), v)).collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k, canonicalize(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        Value::String(text) => Value::String(nfc(text)),
        other => other,
    }
}

fn nfc(text: String) -> String {
    if is_nfc(&text) {
        text
    } else {
        text.nfc().collect()
    }
}
