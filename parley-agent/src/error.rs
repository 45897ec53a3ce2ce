use parley_llm::{FinishReason, LlmError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("provider error: {0}")]
    Provider(#[from] LlmError),

    #[error("provider returned no choices")]
    NoChoices,

    #[error("unexpected finish reason: {0}")]
    UnexpectedFinishReason(FinishReason),

    #[error("tool round limit of {0} exceeded")]
    ToolRoundLimit(usize),

    #[error("run cancelled")]
    Cancelled,
}
