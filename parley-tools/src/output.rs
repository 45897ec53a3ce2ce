use crate::error::ToolError;
use std::fmt::Display;

/// Return types a tool function may produce. Only text reaches the model.
pub trait ToolOutput {
    fn into_tool_output(self) -> Result<String, ToolError>;
}

impl ToolOutput for String {
    fn into_tool_output(self) -> Result<String, ToolError> {
        Ok(self)
    }
}

impl ToolOutput for &'static str {
    fn into_tool_output(self) -> Result<String, ToolError> {
        Ok(self.to_string())
    }
}

impl<T: ToolOutput, E: Display> ToolOutput for Result<T, E> {
    fn into_tool_output(self) -> Result<String, ToolError> {
        match self {
            Ok(v) => v.into_tool_output(),
            Err(e) => Err(ToolError::ExecutionFailed(e.to_string())),
        }
    }
}

/// Only `Value::String` is accepted.
impl ToolOutput for serde_json::Value {
    fn into_tool_output(self) -> Result<String, ToolError> {
        match self {
            serde_json::Value::String(s) => Ok(s),
            _ => Err(ToolError::NonStringResult),
        }
    }
}
