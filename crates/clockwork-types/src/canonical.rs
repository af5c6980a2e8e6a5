//! Canonical JSON serialization.
//!
//! Determinism checks compare two states for equality by their *textual*
//! form, and persisted sessions must round-trip byte-identically. Plain
//! `serde_json::to_string` is not enough: map-backed fields serialize in
//! iteration order, which can differ between runs. The canonical form
//! sorts every object's keys recursively, so equal values always produce
//! equal strings.
//!
//! # Example
//!
//! ```
//! use clockwork_types::canonical::to_canonical_string;
//! use serde_json::json;
//!
//! let a = json!({"b": 1, "a": [true, null]});
//! assert_eq!(to_canonical_string(&a).unwrap(), r#"{"a":[true,null],"b":1}"#);
//! ```

use serde::Serialize;
use serde_json::Value;

/// Serializes a value to its canonical textual form.
///
/// Object keys are sorted recursively; arrays keep their order; scalars
/// use `serde_json`'s standard formatting.
///
/// # Errors
///
/// Returns the underlying `serde_json` error if the value cannot be
/// represented as JSON.
pub fn to_canonical_string<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    let mut out = String::new();
    write_canonical(&value, &mut out)?;
    Ok(out)
}

/// Compares two values by canonical textual equality.
///
/// # Errors
///
/// Returns the underlying `serde_json` error if either value cannot be
/// serialized.
pub fn canonical_eq<A: Serialize, B: Serialize>(a: &A, b: &B) -> Result<bool, serde_json::Error> {
    Ok(to_canonical_string(a)? == to_canonical_string(b)?)
}

fn write_canonical(value: &Value, out: &mut String) -> Result<(), serde_json::Error> {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            out.push_str(&serde_json::to_string(value)?);
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_canonical(&map[*key], out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}
