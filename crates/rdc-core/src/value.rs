//! Dotted-path helpers over the untyped JSON trees that make up a Managed
//! Object's `spec`/`status`/body documents, and the one canonical string
//! rendering used everywhere a JSON value has to become a path segment,
//! query value, or status string.

use serde_json::{Map, Value};

/// Render a JSON value the way the Call Planner, FindBy resolver and status
/// projection all need it: numbers truncate to a 64-bit signed integer
/// (floats lose their fractional part — remote APIs routinely hand back
/// integers as floats after JSON decoding, and the drift detector applies
/// the same widening, so every string rendering in this crate is kept
/// consistent with it), booleans render as `true`/`false`, strings pass
/// through verbatim, `null` renders as an empty string, and anything else
/// (object/array) falls back to its compact JSON encoding.
pub fn render_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else if let Some(f) = n.as_f64() {
                (f.trunc() as i64).to_string()
            } else {
                n.to_string()
            }
        }
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(v).unwrap_or_default(),
    }
}

/// Look up a dotted path (`"a.b.c"`) rooted at `root`. Only traverses JSON
/// objects; a path segment that doesn't resolve to a further object (or is
/// missing) yields `None`.
pub fn get_dotted<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Write `value` at a dotted path, creating intermediate objects as needed.
/// If an intermediate segment exists but isn't an object, it's replaced.
pub fn set_dotted(root: &mut Value, path: &str, value: Value) {
    if !root.is_object() {
        *root = Value::Object(Map::new());
    }
    let segments: Vec<&str> = path.split('.').collect();
    let mut current = root.as_object_mut().expect("just ensured object");

    for segment in &segments[..segments.len() - 1] {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = entry.as_object_mut().expect("just ensured object");
    }

    current.insert(segments[segments.len() - 1].to_string(), value);
}

/// The top-level key/value pairs of an object-shaped JSON value, in
/// insertion order. Returns an empty vec for anything that isn't an object
/// (including `Value::Null`, which a freshly-created MO's `status` often is).
pub fn top_level_fields(v: &Value) -> Vec<(String, Value)> {
    match v.as_object() {
        Some(obj) => obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn render_value_truncates_floats_to_i64() {
        assert_eq!(render_value(&json!(42.4)), "42");
        assert_eq!(render_value(&json!(1.0)), "1");
        assert_eq!(render_value(&json!(7)), "7");
    }

    #[test]
    fn render_value_bools_and_strings() {
        assert_eq!(render_value(&json!(true)), "true");
        assert_eq!(render_value(&json!(false)), "false");
        assert_eq!(render_value(&json!("hello")), "hello");
        assert_eq!(render_value(&Value::Null), "");
    }

    #[test]
    fn get_dotted_traverses_nested_objects() {
        let v = json!({"a": {"b": {"c": 5}}});
        assert_eq!(get_dotted(&v, "a.b.c"), Some(&json!(5)));
        assert_eq!(get_dotted(&v, "a.b.missing"), None);
        assert_eq!(get_dotted(&v, "a.x.c"), None);
    }

    #[test]
    fn set_dotted_creates_intermediate_objects() {
        let mut v = Value::Null;
        set_dotted(&mut v, "a.b.c", json!(5));
        assert_eq!(v, json!({"a": {"b": {"c": 5}}}));
    }

    #[test]
    fn top_level_fields_preserves_insertion_order() {
        let v = json!({"z": 1, "a": 2});
        let fields = top_level_fields(&v);
        assert_eq!(fields[0].0, "z");
        assert_eq!(fields[1].0, "a");
    }
}
