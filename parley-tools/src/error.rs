use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolError>;

/// Failures while executing a registered tool. These are reported back to the model rather
/// than aborting the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("function did not return a string")]
    NonStringResult,

    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("invalid tool name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("tool {name:?} argument schema must be an object, got {found}")]
    NotAnObject { name: String, found: String },
}
