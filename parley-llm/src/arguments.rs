//! Conversion between the canonical string-encoded tool arguments and the structured
//! JSON that Anthropic and Gemini expect.

use serde_json::{Map, Value};

/// Parses a tool-call argument string. Anything that is not valid JSON becomes `{}`.
pub fn decode_arguments(arguments: &str) -> Value {
    if arguments.trim().is_empty() {
        return Value::Object(Map::new());
    }
    match serde_json::from_str(arguments) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(%e, "tool arguments are not valid json; sending empty object");
            Value::Object(Map::new())
        }
    }
}

/// Serializes structured arguments back into the canonical string form. `null` becomes `{}`.
pub fn encode_arguments(args: &Value) -> String {
    if args.is_null() {
        return "{}".to_string();
    }
    args.to_string()
}
