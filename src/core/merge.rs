//! Deep-merge of map-typed field values
//!
//! Nested maps combine key-wise, an explicit `null` in the patch removes the
//! key from the target, and every other value overwrites.

use serde_json::{Map, Value};

/// Merge `patch` into `target` in place
pub fn deep_merge(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        match value {
            Value::Null => {
                target.remove(key);
            }
            Value::Object(nested) => match target.get_mut(key) {
                Some(Value::Object(existing)) => deep_merge(existing, nested),
                _ => {
                    let mut fresh = Map::new();
                    deep_merge(&mut fresh, nested);
                    target.insert(key.clone(), Value::Object(fresh));
                }
            },
            other => {
                target.insert(key.clone(), other.clone());
            }
        }
    }
}

/// Merge `patch` into a copy of `base`
pub fn merged(base: &Map<String, Value>, patch: &Map<String, Value>) -> Map<String, Value> {
    let mut out = base.clone();
    deep_merge(&mut out, patch);
    out
}
