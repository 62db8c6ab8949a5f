//! Canonical JSON rendering and digests for descriptors.
//!
//! Canonical form:
//! - object keys sorted by UTF-16 code units,
//! - integer-valued floats rendered as integers,
//! - NaN/Infinity rejected,
//! - compact output.

use sha2::{Digest, Sha256};

use crate::domain::error::{BlueprintError, Result};

fn canonicalize_value(value: &serde_json::Value) -> Result<serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_by(|a, b| a.encode_utf16().cmp(b.encode_utf16()));

            let mut sorted = serde_json::Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize_value(&map[key])?);
            }
            Ok(serde_json::Value::Object(sorted))
        }
        serde_json::Value::Array(items) => Ok(serde_json::Value::Array(
            items
                .iter()
                .map(canonicalize_value)
                .collect::<Result<Vec<_>>>()?,
        )),
        serde_json::Value::Number(n) if !(n.is_i64() || n.is_u64()) => {
            let Some(f) = n.as_f64() else {
                return Ok(value.clone());
            };
            if !f.is_finite() {
                return Err(BlueprintError::Digest(
                    "NaN/Infinity not permitted in canonical JSON".to_string(),
                ));
            }
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                Ok(serde_json::Value::Number((f as i64).into()))
            } else {
                Ok(value.clone())
            }
        }
        other => Ok(other.clone()),
    }
}

/// Render a JSON value in canonical form.
pub fn canonical_json(value: &serde_json::Value) -> Result<String> {
    let canonical = canonicalize_value(value)?;
    Ok(serde_json::to_string(&canonical)?)
}

/// SHA-256 hex digest of a value's canonical JSON.
pub fn compute_digest(value: &serde_json::Value) -> Result<String> {
    let canonical = canonical_json(value)?;
    Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_order_does_not_affect_output() {
        let a = json!({ "b": 1, "a": { "z": 1, "y": 2 } });
        let b = json!({ "a": { "y": 2, "z": 1 }, "b": 1 });
        assert_eq!(canonical_json(&a).unwrap(), canonical_json(&b).unwrap());
        assert_eq!(canonical_json(&a).unwrap(), r#"{"a":{"y":2,"z":1},"b":1}"#);
    }

    #[test]
    fn test_array_order_preserved() {
        let a = json!({ "sections": ["main", "extra"] });
        let b = json!({ "sections": ["extra", "main"] });
        assert_ne!(compute_digest(&a).unwrap(), compute_digest(&b).unwrap());
    }

    #[test]
    fn test_integer_valued_float_normalized() {
        let input = json!({ "min": 4.0, "ratio": 1.5 });
        assert_eq!(canonical_json(&input).unwrap(), r#"{"min":4,"ratio":1.5}"#);
    }

    #[test]
    fn test_digest_is_hex_sha256() {
        let digest = compute_digest(&json!({ "key": "user.edit" })).unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
