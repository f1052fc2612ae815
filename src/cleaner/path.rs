// src/cleaner/path.rs
//! Dotted-path lookup into provider payloads.
//!
//! `Instances.Instance` walks object keys. On list nodes a segment is an
//! index: the literal `N` means "the record currently being cleaned", any
//! other segment must be a number. A missing key, an out-of-range index or
//! an explicit `null` ends the walk with `None`.

use crate::constants::CURRENT_INDEX_MARKER;
use serde_json::Value;

pub fn extract<'a>(root: &'a Value, path: &str, index: usize) -> Option<&'a Value> {
    let mut node = root;
    for segment in path.split('.') {
        node = match node {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => {
                let position = if segment == CURRENT_INDEX_MARKER {
                    index
                } else {
                    segment.parse::<usize>().ok()?
                };
                items.get(position)?
            }
            _ => return None,
        };
        if node.is_null() {
            return None;
        }
    }
    Some(node)
}

/// Reads a record count that providers send as a number or a numeric string.
pub fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
