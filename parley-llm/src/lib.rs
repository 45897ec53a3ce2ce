//! Provider-neutral chat completion client.
//!
//! Requests and responses are expressed in one canonical model shaped like the OpenAI chat
//! API. Each [`ChatProvider`] adapter translates to and from its vendor's wire format.

mod anthropic;
mod arguments;
mod client;
mod error;
mod gemini;
mod openai;
mod provider;
mod transport;
mod types;

pub use anthropic::AnthropicClient;
pub use arguments::{decode_arguments, encode_arguments};
pub use client::{
    MAX_TOOL_NAME_LEN, Provider, build_provider, detect_provider,
    validate_tool_name_all_providers,
};
pub use error::{LlmError, Result};
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use provider::ChatProvider;
pub use transport::{DEFAULT_TIMEOUT, TransportConfig};
pub use types::{
    ChatMessage, ChatRequest, ChatResponse, Choice, FinishReason, FunctionCall,
    FunctionDescription, ResponseFormat, Role, Tool, ToolCall, Usage,
};

/// Well-known vendor base URLs, for use with the `with_base_url` builders.
pub mod base_urls {
    pub use crate::anthropic::DEFAULT_BASE_URL as ANTHROPIC;
    pub use crate::gemini::DEFAULT_BASE_URL as GEMINI;
    pub use crate::openai::{
        ANYSCALE_BASE_URL as ANYSCALE, CEREBRAS_BASE_URL as CEREBRAS,
        DASHSCOPE_BASE_URL as DASHSCOPE, DEEPSEEK_BASE_URL as DEEPSEEK,
        DEFAULT_BASE_URL as OPENAI, FIREWORKS_BASE_URL as FIREWORKS, GROQ_BASE_URL as GROQ,
        MISTRAL_BASE_URL as MISTRAL, MOONSHOT_BASE_URL as MOONSHOT,
        OPENROUTER_BASE_URL as OPENROUTER, TOGETHER_BASE_URL as TOGETHER, ZAI_BASE_URL as ZAI,
    };
}
