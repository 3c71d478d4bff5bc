//! Layering and lookup of structured configuration documents.

use serde_json::Value;

/// Merge `overlay` on top of `base`.
///
/// Objects merge key by key, recursively. Any other overlay value replaces
/// the base value, arrays included. A null overlay keeps the base value.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut merged), Value::Object(layer)) => {
            for (key, value) in layer {
                let value = match merged.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                merged.insert(key, value);
            }
            Value::Object(merged)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Merge documents in order, later documents winning.
pub fn deep_merge_all(documents: impl IntoIterator<Item = Value>) -> Value {
    documents.into_iter().fold(Value::Null, deep_merge)
}

/// Value at a dotted `key`, walking nested objects. An exact match on the
/// whole key wins over the nested walk.
pub fn lookup<'a>(document: &'a Value, key: &str) -> Option<&'a Value> {
    let object = document.as_object()?;
    if let Some(value) = object.get(key) {
        return Some(value);
    }

    let (head, rest) = key.split_once('.')?;
    lookup(object.get(head)?, rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_objects_merge() {
        let base = json!({"database": {"url": "sqlite://a.db", "pool": 4}, "workers": 2});
        let overlay = json!({"database": {"pool": 16}});

        assert_eq!(
            deep_merge(base, overlay),
            json!({"database": {"url": "sqlite://a.db", "pool": 16}, "workers": 2})
        );
    }

    #[test]
    fn test_arrays_and_scalars_are_replaced() {
        let base = json!({"hosts": ["a", "b"], "port": {"http": 80}});
        let overlay = json!({"hosts": ["c"], "port": 8080});

        assert_eq!(deep_merge(base, overlay), json!({"hosts": ["c"], "port": 8080}));
    }

    #[test]
    fn test_null_keeps_base() {
        let base = json!({"a": 1, "b": {"c": 2}});
        let overlay = json!({"a": null, "b": {"c": null}});

        assert_eq!(deep_merge(base, overlay), json!({"a": 1, "b": {"c": 2}}));
    }

    #[test]
    fn test_merge_all_later_wins() {
        let merged = deep_merge_all([json!({"a": 1}), json!({"b": 2}), json!({"a": 3})]);
        assert_eq!(merged, json!({"a": 3, "b": 2}));
    }

    #[test]
    fn test_lookup() {
        let doc = json!({
            "database": {"url": "postgres://db", "pool": {"size": 8}},
            "log.level": "debug"
        });

        assert_eq!(lookup(&doc, "database.url"), Some(&json!("postgres://db")));
        assert_eq!(lookup(&doc, "database.pool.size"), Some(&json!(8)));
        assert_eq!(lookup(&doc, "log.level"), Some(&json!("debug")));
        assert_eq!(lookup(&doc, "database.missing"), None);
        assert_eq!(lookup(&doc, "database.url.deeper"), None);
    }
}
