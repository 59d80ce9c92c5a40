//! 配置数据规范化
//!
//! 把 sidecar 返回的嵌套 JSON 转换为扁平映射。以下两种写法等价，
//! 后者为规范形式：
//!
//! ```json
//! { "Compound": { "Key": "value" } }
//! { "Compound:Key": "value" }
//! ```
//!
//! 数组被视为以数字为键的对象，因此 `{"a": ["x", "y"]}` 产生
//! `a:0 = x` 和 `a:1 = y`。

use crate::error::ReloadError;
use crate::snapshot::mapping::{combine_path, FlatMap};
use serde_json::{Map, Value};

/// JSON 值种类名称，用于错误信息
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "object",
        Value::Array(_) => "array",
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Null => "null",
    }
}

/// 将 JSON 文档扁平化
///
/// # 参数
/// * `root` - 顶层必须为对象
///
/// # 返回
/// * `Result<FlatMap, ReloadError>` - 顶层不是对象时返回 `MalformedInput`
///
/// 原始键中已经包含 `:` 时按字面处理，可能与嵌套对象产生的键冲突，
/// 冲突时后写入者胜出。
pub fn flatten(root: &Value) -> Result<FlatMap, ReloadError> {
    let Value::Object(object) = root else {
        return Err(ReloadError::MalformedInput(format!(
            "顶层 JSON 必须是对象，实际为 {}",
            json_kind(root)
        )));
    };

    let mut data = FlatMap::new();
    let mut context = Vec::new();
    visit_object(object, &mut context, &mut data);
    Ok(data)
}

fn visit_object(object: &Map<String, Value>, context: &mut Vec<String>, data: &mut FlatMap) {
    for (name, value) in object {
        context.push(name.clone());
        visit_value(value, context, data);
        context.pop();
    }
}

fn visit_array(array: &[Value], context: &mut Vec<String>, data: &mut FlatMap) {
    for (index, value) in array.iter().enumerate() {
        context.push(index.to_string());
        visit_value(value, context, data);
        context.pop();
    }
}

fn visit_value(value: &Value, context: &mut Vec<String>, data: &mut FlatMap) {
    match value {
        Value::Object(object) => visit_object(object, context, data),
        Value::Array(array) => visit_array(array, context, data),
        scalar => data.insert(combine_path(context.as_slice()), scalar_to_string(scalar)),
    }
}

/// 标量转字符串；布尔值为 `True`/`False`，null 映射为空字符串
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(text: &str) -> Value {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_nested_and_compound_forms_are_equivalent() {
        let nested = flatten(&json!({"a": {"b": "v"}})).unwrap();
        let compound = flatten(&json!({"a:b": "v"})).unwrap();

        assert_eq!(nested, compound);
        assert_eq!(nested.get("a:b"), Some("v"));
    }

    #[test]
    fn test_arrays_are_indexed_like_objects() {
        let data = flatten(&json!({"a": ["x", "y"]})).unwrap();

        assert_eq!(data.len(), 2);
        assert_eq!(data.get("a:0"), Some("x"));
        assert_eq!(data.get("a:1"), Some("y"));
    }

    #[test]
    fn test_nested_arrays_of_objects() {
        let data = flatten(&json!({
            "Servers": [
                {"Host": "a.internal", "Ports": [80, 443]},
                {"Host": "b.internal"}
            ]
        }))
        .unwrap();

        assert_eq!(data.get("Servers:0:Host"), Some("a.internal"));
        assert_eq!(data.get("Servers:0:Ports:1"), Some("443"));
        assert_eq!(data.get("Servers:1:Host"), Some("b.internal"));
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn test_scalar_stringification() {
        let data = flatten(&parse(
            r#"{"s": "text", "i": 42, "f": 1.50, "t": true, "u": false, "n": null}"#,
        ))
        .unwrap();

        assert_eq!(data.get("s"), Some("text"));
        assert_eq!(data.get("i"), Some("42"));
        assert_eq!(data.get("f"), Some("1.50"));
        assert_eq!(data.get("t"), Some("True"));
        assert_eq!(data.get("u"), Some("False"));
        assert_eq!(data.get("n"), Some(""));
    }

    #[test]
    fn test_empty_containers_produce_no_keys() {
        let data = flatten(&json!({"a": {}, "b": [], "c": "v"})).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data.get("c"), Some("v"));
    }

    #[test]
    fn test_non_object_root_is_rejected() {
        for (root, kind) in [
            (json!(["x"]), "array"),
            (json!("x"), "string"),
            (json!(1), "number"),
            (json!(false), "boolean"),
            (Value::Null, "null"),
        ] {
            match flatten(&root) {
                Err(ReloadError::MalformedInput(message)) => assert!(message.contains(kind)),
                other => panic!("期望 MalformedInput，实际为 {other:?}"),
            }
        }
    }

    #[test]
    fn test_delimiter_collision_is_last_write_wins() {
        let data = flatten(&parse(r#"{"a": {"b": "nested"}, "a:b": "literal"}"#)).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data.get("a:b"), Some("literal"));

        let data = flatten(&parse(r#"{"a:b": "literal", "a": {"b": "nested"}}"#)).unwrap();
        assert_eq!(data.get("a:b"), Some("nested"));
    }

    #[test]
    fn test_duplicate_json_keys_keep_last_value() {
        let data = flatten(&parse(r#"{"k": "first", "k": "second"}"#)).unwrap();
        assert_eq!(data.get("k"), Some("second"));
    }
}
