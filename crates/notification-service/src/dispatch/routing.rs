//! 投递前的事件改写

use serde_json::{Map, Value};

/// 把规则的 extensions 合并进事件的 `extensions` 对象
///
/// 事件没有 `extensions` 或不是对象时从空对象开始；同名键以规则为准。
/// 非对象事件原样返回。
pub fn merge_extensions(event: &Value, rule_extensions: &Map<String, Value>) -> Value {
    let mut routed = event.clone();
    let Some(fields) = routed.as_object_mut() else {
        return routed;
    };

    let mut merged = match fields.remove("extensions") {
        Some(Value::Object(existing)) => existing,
        _ => Map::new(),
    };
    for (key, value) in rule_extensions {
        merged.insert(key.clone(), value.clone());
    }
    fields.insert("extensions".to_string(), Value::Object(merged));

    routed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule_ext(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_rule_keys_win() {
        let event = json!({"id": "1", "extensions": {"a": "event", "b": "kept"}});
        let routed = merge_extensions(&event, &rule_ext(json!({"a": "rule", "c": 3})));

        assert_eq!(routed["extensions"], json!({"a": "rule", "b": "kept", "c": 3}));
        assert_eq!(routed["id"], "1");
        // 原事件不变
        assert_eq!(event["extensions"]["a"], "event");
    }

    #[test]
    fn test_missing_or_invalid_extensions() {
        let routed = merge_extensions(&json!({"id": "1"}), &rule_ext(json!({"k": "v"})));
        assert_eq!(routed["extensions"], json!({"k": "v"}));

        let routed = merge_extensions(
            &json!({"id": "1", "extensions": "bogus"}),
            &rule_ext(json!({"k": "v"})),
        );
        assert_eq!(routed["extensions"], json!({"k": "v"}));
    }

    #[test]
    fn test_empty_rule_extensions() {
        let routed = merge_extensions(&json!({"id": "1"}), &Map::new());
        assert_eq!(routed["extensions"], json!({}));
    }

    #[test]
    fn test_non_object_event_unchanged() {
        let event = json!([1, 2]);
        assert_eq!(merge_extensions(&event, &rule_ext(json!({"k": "v"}))), event);
    }
}
