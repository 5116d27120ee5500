//! Generic helpers for walking loosely-shaped JSON trees.
//!
//! API payloads nest the interesting bits at varying depths, so callers look
//! things up by key or by field predicates instead of by fixed paths.

use serde_json::Value;

/// Return the first value stored under `key` anywhere in `value`.
///
/// An object's own keys win over anything nested inside it; children are then
/// searched depth-first in document order.
///
/// ```
/// use roost_common::json::find_json_key;
/// use serde_json::json;
///
/// let v = json!({ "data": { "entries": [1, 2] }, "meta": { "entries": [] } });
/// assert_eq!(find_json_key(&v, "entries"), Some(&json!([1, 2])));
/// assert!(find_json_key(&v, "missing").is_none());
/// ```
pub fn find_json_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            if let Some(found) = map.get(key) {
                return Some(found);
            }
            map.values().find_map(|child| find_json_key(child, key))
        }
        Value::Array(items) => items.iter().find_map(|child| find_json_key(child, key)),
        _ => None,
    }
}

/// Return the first object anywhere in `value` whose fields equal every
/// `(key, expected)` predicate.
///
/// ```
/// use roost_common::json::filter_json;
/// use serde_json::json;
///
/// let v = json!([
///     { "content": { "cursorType": "Top", "value": "A" } },
///     { "content": { "cursorType": "Bottom", "value": "B" } }
/// ]);
/// let hit = filter_json(&v, &[("cursorType", json!("Bottom"))]).unwrap();
/// assert_eq!(hit["value"], "B");
/// ```
pub fn filter_json<'a>(value: &'a Value, predicates: &[(&str, Value)]) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            let matches = !predicates.is_empty()
                && predicates
                    .iter()
                    .all(|(key, expected)| map.get(*key) == Some(expected));
            if matches {
                return Some(value);
            }
            map.values()
                .find_map(|child| filter_json(child, predicates))
        }
        Value::Array(items) => items
            .iter()
            .find_map(|child| filter_json(child, predicates)),
        _ => None,
    }
}

/// Convenience for string-valued lookups: the string under `key`, if any.
pub fn find_json_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    find_json_key(value, key).and_then(Value::as_str)
}

/// True when `value` is missing, `null`, or an empty object/array.
pub fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn own_key_beats_nested_key() {
        let v = json!({ "inner": { "id": "nested" }, "id": "top" });
        assert_eq!(find_json_str(&v, "id"), Some("top"));
    }

    #[test]
    fn finds_key_inside_arrays() {
        let v = json!({ "instructions": [ {}, { "entries": [ { "entryId": "user-1" } ] } ] });
        let entries = find_json_key(&v, "entries").unwrap();
        assert_eq!(entries[0]["entryId"], "user-1");
    }

    #[test]
    fn filter_requires_every_predicate() {
        let v = json!([
            { "cursorType": "Bottom", "entryType": "Other", "value": "x" },
            { "cursorType": "Bottom", "entryType": "TimelineTimelineCursor", "value": "y" }
        ]);
        let hit = filter_json(
            &v,
            &[
                ("cursorType", json!("Bottom")),
                ("entryType", json!("TimelineTimelineCursor")),
            ],
        )
        .unwrap();
        assert_eq!(hit["value"], "y");
    }

    #[test]
    fn filter_without_match_or_predicates_is_none() {
        let v = json!({ "cursorType": "Top" });
        assert!(filter_json(&v, &[("cursorType", json!("Bottom"))]).is_none());
        assert!(filter_json(&v, &[]).is_none());
    }

    #[test]
    fn empty_payload_detection() {
        assert!(is_empty_payload(&json!({})));
        assert!(is_empty_payload(&json!(null)));
        assert!(is_empty_payload(&json!([])));
        assert!(!is_empty_payload(&json!({ "a": 1 })));
        assert!(!is_empty_payload(&json!("")));
    }
}
