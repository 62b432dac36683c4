//! Recursive JSON merge for feed delta accumulation
//!
//! Objects merge key-by-key, everything else overwrites. An incoming `null`
//! means "no update" for that field, not "clear": the feed never nulls a
//! field to erase it.

use serde_json::Value;

pub fn deep_merge(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, source_value) in source_map {
                if source_value.is_null() {
                    continue;
                }
                match target_map.get_mut(key) {
                    Some(target_value) => deep_merge(target_value, source_value),
                    None => {
                        target_map.insert(key.clone(), source_value.clone());
                    }
                }
            }
        }
        (target, source) => {
            if !source.is_null() {
                *target = source.clone();
            }
        }
    }
}
