//! Deep merge of template trees.
//!
//! Inheritance layers a derived document over its base: maps merge key by key,
//! while lists and scalars from the override replace the base value whole.

use crate::value::{Map, Value};

/// Merge two optional trees, treating `None` and [`Value::Null`] alike.
///
/// `merge(null, x) = x`, `merge(x, null) = x` and `merge(null, null) = {}`.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use tplforge::merge::merge;
/// use tplforge::value::Value;
///
/// let base = Value::from(json!({ "meta": { "version": "1.0.0", "status": "stable" } }));
/// let overrides = Value::from(json!({ "meta": { "version": "2.0.0" } }));
///
/// let merged = merge(Some(&base), Some(&overrides));
/// assert_eq!(merged, Value::from(json!({ "meta": { "version": "2.0.0", "status": "stable" } })));
/// ```
#[must_use]
pub fn merge(base: Option<&Value>, overrides: Option<&Value>) -> Value {
    let base = base.filter(|v| !v.is_null());
    let overrides = overrides.filter(|v| !v.is_null());

    match (base, overrides) {
        (None, None) => Value::empty_map(),
        (Some(base), None) => base.clone(),
        (None, Some(overrides)) => overrides.clone(),
        (Some(base), Some(overrides)) => deep_merge(base.clone(), overrides),
    }
}

/// Recursively merges `overrides` into `base`.
///
/// When both sides are maps, every key of `overrides` is merged into `base`;
/// otherwise `overrides` replaces `base` outright.
#[must_use]
pub fn deep_merge(base: Value, overrides: &Value) -> Value {
    match (base, overrides) {
        (Value::Map(base_map), Value::Map(override_map)) => Value::Map(merge_maps(base_map, override_map)),
        (_, overrides) => overrides.clone(),
    }
}

/// Map-level form of [`deep_merge`]. Keys new to `base` are appended in
/// override order; existing keys keep their base position.
#[must_use]
pub fn merge_maps(mut base: Map, overrides: &Map) -> Map {
    for (key, override_value) in overrides {
        match base.get_mut(key.as_str()) {
            Some(base_value)
                if matches!(base_value, Value::Map(_)) && matches!(override_value, Value::Map(_)) =>
            {
                let current = std::mem::take(base_value);
                *base_value = deep_merge(current, override_value);
            }
            Some(base_value) => *base_value = override_value.clone(),
            None => {
                base.insert(key.clone(), override_value.clone());
            }
        }
    }
    base
}
