//! Canonical JSON used as the signing payload.
//!
//! Rules: object keys sorted lexicographically at every depth, no
//! insignificant whitespace, members whose value is `null` omitted (an
//! absent optional field and an explicit `null` sign identically), and the
//! top-level `signature` member excluded.

use serde::Serialize;
use serde_json::Value;

use crate::error::CryptoError;

/// Name of the member that never takes part in the signing payload.
pub const SIGNATURE_FIELD: &str = "signature";

/// Canonical signing payload of a record (its `signature` member excluded).
pub fn canonical_bytes<T: Serialize + ?Sized>(record: &T) -> Result<Vec<u8>, CryptoError> {
    canonical_bytes_with(record, &[SIGNATURE_FIELD])
}

/// Canonical string form of any serializable value (nothing excluded).
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CryptoError> {
    let bytes = canonical_bytes_with(value, &[])?;
    String::from_utf8(bytes).map_err(|e| CryptoError::Canonicalization(e.to_string()))
}

pub(crate) fn canonical_bytes_with<T: Serialize + ?Sized>(
    value: &T,
    excluded_top_level: &[&str],
) -> Result<Vec<u8>, CryptoError> {
    let value =
        serde_json::to_value(value).map_err(|e| CryptoError::Canonicalization(e.to_string()))?;
    let mut out = String::new();
    match &value {
        Value::Object(map) => write_object(map, excluded_top_level, &mut out)?,
        other => write_value(other, &mut out)?,
    }
    Ok(out.into_bytes())
}

fn write_value(value: &Value, out: &mut String) -> Result<(), CryptoError> {
    match value {
        Value::Object(map) => write_object(map, &[], out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out)?;
            }
            out.push(']');
            Ok(())
        }
        scalar => {
            let text = serde_json::to_string(scalar)
                .map_err(|e| CryptoError::Canonicalization(e.to_string()))?;
            out.push_str(&text);
            Ok(())
        }
    }
}

fn write_object(
    map: &serde_json::Map<String, Value>,
    excluded: &[&str],
    out: &mut String,
) -> Result<(), CryptoError> {
    let mut keys: Vec<&String> = map
        .iter()
        .filter(|(k, v)| !v.is_null() && !excluded.contains(&k.as_str()))
        .map(|(k, _)| k)
        .collect();
    keys.sort();

    out.push('{');
    for (i, key) in keys.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let quoted =
            serde_json::to_string(key).map_err(|e| CryptoError::Canonicalization(e.to_string()))?;
        out.push_str(&quoted);
        out.push(':');
        write_value(&map[key], out)?;
    }
    out.push('}');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sorted_keys_nested() {
        let v = json!({ "b": 1, "a": { "d": [3, { "z": 1, "y": 2 }], "c": "x" } });
        assert_eq!(
            canonical_json(&v).unwrap(),
            r#"{"a":{"c":"x","d":[3,{"y":2,"z":1}]},"b":1}"#
        );
    }

    #[test]
    fn test_signature_excluded_only_at_top_level() {
        let v = json!({ "id": "1", "signature": "abc", "inner": { "signature": "keep" } });
        let bytes = canonical_bytes(&v).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"id":"1","inner":{"signature":"keep"}}"#
        );
    }

    #[test]
    fn test_null_members_omitted() {
        let with_null = json!({ "a": 1, "notes": null });
        let without = json!({ "a": 1 });
        assert_eq!(
            canonical_bytes(&with_null).unwrap(),
            canonical_bytes(&without).unwrap()
        );
    }

    #[test]
    fn test_string_escaping() {
        let v = json!({ "name": "quote\"and\\slash" });
        assert_eq!(canonical_json(&v).unwrap(), r#"{"name":"quote\"and\\slash"}"#);
    }

    #[test]
    fn test_scalar_top_level() {
        assert_eq!(canonical_json(&42).unwrap(), "42");
        assert_eq!(canonical_json("s").unwrap(), "\"s\"");
    }
}
