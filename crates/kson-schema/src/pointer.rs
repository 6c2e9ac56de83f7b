//! RFC 6901 JSON-Pointer navigation over a [`kson_syntax::Value`].
//!
//! Grounded on the teacher's `jsonschema_explain::schema::navigate_pointer`:
//! the same `~1`/`~0` decoding and object/array dual lookup, generalized
//! from "explain a schema" to "resolve a `$ref`" during schema compilation.

use kson_syntax::Value;

/// Walk `pointer` (a `/`-separated, RFC-6901-encoded path) from `root`.
///
/// Returns `None` if any segment cannot be resolved (unknown key, or a
/// non-numeric/out-of-range array index).
pub fn navigate<'a>(root: &'a Value, pointer: &str) -> Option<&'a Value> {
    let path = pointer.strip_prefix('/').unwrap_or(pointer);
    if path.is_empty() {
        return Some(root);
    }

    let mut current = root;
    for segment in path.split('/') {
        let decoded = decode_segment(segment);
        current = match current {
            Value::Object(map, _) => map.get(&decoded)?,
            Value::List(items, _) => {
                let idx: usize = decoded.parse().ok()?;
                items.get(idx)?
            }
            _ => return None,
        };
    }
    Some(current)
}

fn decode_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

#[cfg(test)]
mod tests {
    use super::*;
    use kson_syntax::analyze;

    #[test]
    fn navigates_nested_object() {
        let value = analyze("defs: { foo: { type: \"string\" } }").value.unwrap();
        let found = navigate(&value, "/defs/foo/type").unwrap();
        assert_eq!(found.as_str(), Some("string"));
    }

    #[test]
    fn navigates_array_index() {
        let value = analyze("items: [1, 2, 3]").value.unwrap();
        let found = navigate(&value, "/items/1").unwrap();
        assert_eq!(found.type_name(), "integer");
    }

    #[test]
    fn decodes_tilde_escapes() {
        let value = analyze("\"a/b\": 1").value.unwrap();
        let found = navigate(&value, "/a~1b").unwrap();
        assert_eq!(found.type_name(), "integer");
    }

    #[test]
    fn unknown_segment_is_none() {
        let value = analyze("a: 1").value.unwrap();
        assert!(navigate(&value, "/missing").is_none());
    }
}
