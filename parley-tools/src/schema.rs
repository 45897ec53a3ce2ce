//! JSON Schema generation for tool argument records.

use schemars::generate::SchemaSettings;
use schemars::transform::{Transform, transform_subschemas};
use schemars::{JsonSchema, Schema};
use serde_json::{Map, Value};

/// Draft-07 schema for `A` with every subschema inlined, since several vendors reject `$ref`.
/// The `$schema` and root `title` keys are removed, and optional fields keep a single type.
pub fn schema_for<A: JsonSchema>() -> Value {
    let generator = SchemaSettings::draft07()
        .with(|s| s.inline_subschemas = true)
        .with_transform(DropNullType)
        .into_generator();
    let mut schema: Value = generator.into_root_schema_for::<A>().into();
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    schema
}

/// Collapses `"type": [T, "null"]` to `T` and drops `{"type": "null"}` arms from `anyOf`.
/// Gemini function declarations reject type arrays.
#[derive(Debug, Clone)]
struct DropNullType;

impl Transform for DropNullType {
    fn transform(&mut self, schema: &mut Schema) {
        if let Some(obj) = schema.as_object_mut() {
            collapse_type_array(obj);
            collapse_any_of(obj);
        }
        transform_subschemas(self, schema);
    }
}

fn collapse_type_array(obj: &mut Map<String, Value>) {
    let single = match obj.get_mut("type") {
        Some(Value::Array(types)) => {
            types.retain(|t| t.as_str() != Some("null"));
            if types.len() == 1 { types.pop() } else { None }
        }
        _ => None,
    };
    if let Some(t) = single {
        obj.insert("type".to_string(), t);
        if let Some(Value::Array(values)) = obj.get_mut("enum") {
            values.retain(|v| !v.is_null());
        }
    }
}

fn collapse_any_of(obj: &mut Map<String, Value>) {
    let single = match obj.get_mut("anyOf") {
        Some(Value::Array(variants)) => {
            variants.retain(|v| v.get("type").and_then(Value::as_str) != Some("null"));
            if variants.len() == 1 { variants.pop() } else { None }
        }
        _ => None,
    };
    if let Some(Value::Object(inner)) = single {
        obj.remove("anyOf");
        for (key, value) in inner {
            obj.entry(key).or_insert(value);
        }
    } else if let Some(other) = single {
        obj.insert("anyOf".to_string(), Value::Array(vec![other]));
    }
}

/// The JSON type name declared at the schema root, or a short description when absent.
pub(crate) fn root_type(schema: &Value) -> String {
    match schema.get("type") {
        Some(Value::String(t)) => t.clone(),
        Some(other) => other.to_string(),
        None if schema.is_object() => "untyped schema".to_string(),
        None => "non-object schema".to_string(),
    }
}

pub(crate) fn is_object_schema(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("object")
}
