//! Response envelopes and error templates.
//!
//! Templates are example JSON values supplied by configuration. Their shape
//! is inferred into a [`Schema`], and the payload schema is spliced in at a
//! dotted field path.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::schema::Schema;

/// Infers a JSON Schema from an example value.
///
/// Objects become `properties`, arrays take the shape of their first element,
/// scalars map to their JSON type.
pub fn schema_of(value: &Value) -> Schema {
    match value {
        Value::Null => Schema::typed("null"),
        Value::Bool(_) => Schema::typed("boolean"),
        Value::Number(_) => Schema::typed("number"),
        Value::String(_) => Schema::typed("string"),
        Value::Array(items) => match items.first() {
            Some(first) => Schema::array_of(schema_of(first)),
            None => Schema::typed("array"),
        },
        Value::Object(fields) => {
            let mut schema = Schema::typed("object");
            let properties: BTreeMap<String, Schema> = fields
                .iter()
                .map(|(key, value)| (key.clone(), schema_of(value)))
                .collect();
            if !properties.is_empty() {
                schema.properties = Some(properties);
            }
            schema
        }
    }
}

/// Sets `value` at a dotted path, creating (or replacing non-object)
/// intermediates along the way.
pub fn set_path(target: &mut Value, path: &str, value: Value) {
    let mut segments = path.split('.').filter(|s| !s.is_empty()).peekable();
    let mut cursor = target;
    while let Some(segment) = segments.next() {
        if !cursor.is_object() {
            *cursor = Value::Object(Map::new());
        }
        let Value::Object(map) = cursor else {
            return;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        cursor = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

/// A deep copy of the error template with message and code filled in.
pub fn patch_error(
    template: &Value,
    message_path: &str,
    code_path: &str,
    message: &str,
    code: u16,
) -> Value {
    let mut error = template.clone();
    set_path(&mut error, message_path, Value::String(message.to_string()));
    set_path(&mut error, code_path, Value::from(code));
    error
}

/// Wraps `payload` in the envelope inferred from `wrapper`.
///
/// The payload replaces the envelope field at `field_path` when that field
/// exists; with no payload the field is removed instead. Without a wrapper
/// the payload passes through unchanged.
pub fn fill_template(
    payload: Option<Schema>,
    wrapper: Option<&Value>,
    field_path: &str,
) -> Option<Schema> {
    let Some(wrapper) = wrapper else {
        return payload;
    };
    let mut envelope = schema_of(wrapper);
    let segments: Vec<&str> = field_path.split('.').filter(|s| !s.is_empty()).collect();

    match payload {
        Some(payload) => match field_mut(&mut envelope, &segments) {
            Some(slot) => *slot = payload,
            None => tracing::warn!(
                field_path,
                "wrapper template has no replacement field, payload schema dropped"
            ),
        },
        None => remove_field(&mut envelope, &segments),
    }
    Some(envelope)
}

fn field_mut<'s>(schema: &'s mut Schema, segments: &[&str]) -> Option<&'s mut Schema> {
    let (first, rest) = segments.split_first()?;
    let child = schema.properties.as_mut()?.get_mut(*first)?;
    if rest.is_empty() {
        Some(child)
    } else {
        field_mut(child, rest)
    }
}

fn remove_field(schema: &mut Schema, segments: &[&str]) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let parent = if parents.is_empty() {
        Some(schema)
    } else {
        field_mut(schema, parents)
    };
    if let Some(properties) = parent.and_then(|p| p.properties.as_mut()) {
        properties.remove(*last);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn infers_nested_shapes() {
        let schema = schema_of(&json!({
            "data": {},
            "meta": {"tags": ["a"], "ok": true, "count": 3, "next": null}
        }));
        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!({
                "type": "object",
                "properties": {
                    "data": {"type": "object"},
                    "meta": {"type": "object", "properties": {
                        "count": {"type": "number"},
                        "next": {"type": "null"},
                        "ok": {"type": "boolean"},
                        "tags": {"type": "array", "items": {"type": "string"}}
                    }}
                }
            })
        );
    }

    #[test]
    fn set_path_creates_intermediates() {
        let mut value = json!({"error": "oops"});
        set_path(&mut value, "error.message", json!("Unauthorized"));
        set_path(&mut value, "status.code", json!(401));
        assert_eq!(
            value,
            json!({"error": {"message": "Unauthorized"}, "status": {"code": 401}})
        );
    }

    #[test]
    fn patch_error_leaves_template_untouched() {
        let template = json!({"error": {"message": "", "code": 0}});
        let patched = patch_error(&template, "error.message", "error.code", "Too Many Requests", 429);
        assert_eq!(patched, json!({"error": {"message": "Too Many Requests", "code": 429}}));
        assert_eq!(template, json!({"error": {"message": "", "code": 0}}));
    }

    #[test]
    fn fills_nested_replacement_field() {
        let wrapper = json!({"result": {"data": {}, "ok": true}});
        let filled = fill_template(
            Some(Schema::component("Person")),
            Some(&wrapper),
            "result.data",
        )
        .unwrap();
        let result = &filled.properties.as_ref().unwrap()["result"];
        assert_eq!(
            result.properties.as_ref().unwrap()["data"].component_target(),
            Some("Person")
        );
    }

    #[test]
    fn empty_payload_removes_field_and_missing_wrapper_passes_through() {
        let wrapper = json!({"data": {}, "ok": true});
        let filled = fill_template(None, Some(&wrapper), "data").unwrap();
        let keys: Vec<&String> = filled.properties.as_ref().unwrap().keys().collect();
        assert_eq!(keys, vec!["ok"]);

        assert_eq!(fill_template(None, None, "data"), None);
        assert_eq!(
            fill_template(Some(Schema::typed("string")), None, "data"),
            Some(Schema::typed("string"))
        );
    }
}
