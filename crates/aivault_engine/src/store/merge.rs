//! Recursive merge of a saved tree onto defaults.

use serde_json::{Map, Value};

/// Merges `source` onto `target` and returns the result.
///
/// Non-null objects in `source` merge recursively; a missing or non-object
/// counterpart in `target` is treated as an empty object. Every other value
/// in `source` (scalars, `null`, arrays) replaces the target value whole.
/// Keys present only in `target` are kept.
pub fn deep_merge(target: &Value, source: &Value) -> Value {
    let (Value::Object(base), Value::Object(overlay)) = (target, source) else {
        return source.clone();
    };

    let mut merged = base.clone();
    for (key, incoming) in overlay {
        let value = match incoming {
            Value::Object(_) => {
                let empty = Value::Object(Map::new());
                let current = match merged.get(key) {
                    Some(existing @ Value::Object(_)) => existing,
                    _ => &empty,
                };
                deep_merge(current, incoming)
            }
            other => other.clone(),
        };
        merged.insert(key.clone(), value);
    }
    Value::Object(merged)
}
