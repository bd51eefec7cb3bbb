//! Dot-addressed access into JSON state.
//!
//! A field path such as `search.q` names the `q` member of the `search` object.
//! Storage backends that treat `.` specially get keys from [`storage_key`], which
//! writes each dot as `__`.

use serde_json::{Map, Value};

const KEY_SEPARATOR: &str = "__";

/// Reads the value at `path`, or `None` if any segment is missing or a
/// non-object is traversed.
#[must_use]
pub fn get_path<'a>(state: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    segments.try_fold(state.get(first)?, |current, segment| current.as_object()?.get(segment))
}

/// Writes `value` at `path`, creating intermediate objects as needed.
///
/// Intermediate values that are not objects are replaced by objects.
pub fn set_path(state: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(last) = segments.pop() else {
        return;
    };

    let mut current = state;
    for segment in segments {
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(next) = slot else {
            return;
        };
        current = next;
    }
    current.insert(last.to_string(), value);
}

/// The storage key for a field path.
#[must_use]
pub fn storage_key(field: &str) -> String {
    field.replace('.', KEY_SEPARATOR)
}

/// The field path for a storage key; inverse of [`storage_key`].
#[must_use]
pub fn field_from_key(key: &str) -> String {
    key.replace(KEY_SEPARATOR, ".")
}
