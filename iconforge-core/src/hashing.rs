//! Hashing System - SHA-256 Build Fingerprints
//!
//! Stable across runs of an unchanged tree: the manifest's `generatedAt`
//! is never part of a fingerprint.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// SHA-256 of bytes, lowercase hex
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Rebuild every object with its keys in byte order.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
            Value::Object(ordered.into_iter().collect::<Map<_, _>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Compact JSON with sorted keys, as fed to [`fingerprint`].
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(&canonicalize(serde_json::to_value(value)?))
}

/// SHA-256 of the canonical JSON of `value`, streamed into the hasher.
pub fn fingerprint<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut hasher = Sha256::new();
    serde_json::to_writer(&mut hasher, &canonicalize(serde_json::to_value(value)?))?;
    Ok(format!("{:x}", hasher.finalize()))
}
