//! Anthropic Messages API adapter.
//!
//! System turns move to the top-level `system` field, tool calls and results become
//! content blocks, and tool results ride inside user turns.

use crate::error::Result;
use crate::provider::ChatProvider;
use crate::transport::{HttpTransport, TransportConfig};
use crate::types::{
    ChatMessage, ChatRequest, ChatResponse, FinishReason, Role, Tool, ToolCall, Usage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const VENDOR: &str = "anthropic";
const MESSAGES_PATH: &str = "/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Clone)]
pub struct AnthropicClient {
    api_key: String,
    model: String,
    config: TransportConfig,
    transport: HttpTransport,
}

impl AnthropicClient {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self::with_config(api_key, model, TransportConfig::new(DEFAULT_BASE_URL))
    }

    pub fn with_config(api_key: &str, model: &str, config: TransportConfig) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            transport: HttpTransport::new(VENDOR, config.clone()),
            config,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.to_string();
        self.rebuild()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self.rebuild()
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.config.http = Some(http);
        self.rebuild()
    }

    fn rebuild(mut self) -> Self {
        self.transport = HttpTransport::new(VENDOR, self.config.clone());
        self
    }
}

#[async_trait]
impl ChatProvider for AnthropicClient {
    #[tracing::instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn create_chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let native = AnthropicRequest::from_canonical(req);
        let headers = [
            ("x-api-key", self.api_key.as_str()),
            ("anthropic-version", ANTHROPIC_VERSION),
        ];

        let body = self
            .transport
            .post_json(MESSAGES_PATH, &headers, &native)
            .await?;
        let parsed: AnthropicResponse = self.transport.decode(&body)?;
        let resp = ChatResponse::from(parsed);
        tracing::debug!(
            finish_reason = %resp.choices[0].finish_reason,
            tool_calls = resp.choices[0].message.tool_calls.len(),
            prompt_tokens = resp.usage.prompt_tokens,
            completion_tokens = resp.usage.completion_tokens,
            "anthropic chat completed"
        );
        Ok(resp)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AnthropicRequest {
    pub(crate) model: String,
    pub(crate) max_tokens: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub(crate) system: String,
    pub(crate) messages: Vec<AnthropicMessage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) tools: Vec<AnthropicTool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) stop_sequences: Vec<String>,
}

impl AnthropicRequest {
    pub(crate) fn from_canonical(req: &ChatRequest) -> Self {
        let mut system = String::new();
        let mut messages = Vec::with_capacity(req.messages.len());

        for m in &req.messages {
            match m.role {
                Role::System => {
                    if !system.is_empty() {
                        system.push('\n');
                    }
                    system.push_str(&m.content);
                }
                Role::User => messages.push(AnthropicMessage {
                    role: "user".to_string(),
                    content: AnthropicContent::Text(m.content.clone()),
                }),
                Role::Assistant => messages.push(to_anthropic_assistant_message(m)),
                Role::Tool => messages.push(to_anthropic_tool_result_message(m)),
            }
        }

        Self {
            model: req.model.clone(),
            max_tokens: req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages,
            tools: req.tools.iter().map(AnthropicTool::from).collect(),
            temperature: req.temperature,
            top_p: req.top_p,
            stop_sequences: req.stop.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AnthropicTool {
    pub(crate) name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub(crate) description: String,
    pub(crate) input_schema: serde_json::Value,
}

impl From<&Tool> for AnthropicTool {
    fn from(t: &Tool) -> Self {
        Self {
            name: t.function.name.clone(),
            description: t.function.description.clone(),
            input_schema: t.function.parameters.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AnthropicMessage {
    pub(crate) role: String,
    pub(crate) content: AnthropicContent,
}

/// A turn's content: a bare string, or a list of blocks when tools are involved.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum AnthropicContent {
    Text(String),
    Blocks(Vec<AnthropicContentBlock>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum AnthropicContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        // Defined by the wire format; canonical messages carry no failure flag, so it is
        // never set.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
    /// Block kinds this adapter does not model (thinking, server tools, ...).
    #[serde(other)]
    Unsupported,
}

fn to_anthropic_assistant_message(m: &ChatMessage) -> AnthropicMessage {
    if m.tool_calls.is_empty() {
        return AnthropicMessage {
            role: "assistant".to_string(),
            content: AnthropicContent::Text(m.content.clone()),
        };
    }

    let mut blocks = Vec::with_capacity(m.tool_calls.len() + 1);
    if !m.content.is_empty() {
        blocks.push(AnthropicContentBlock::Text {
            text: m.content.clone(),
        });
    }
    for tc in &m.tool_calls {
        blocks.push(AnthropicContentBlock::ToolUse {
            id: tc.id.clone(),
            name: tc.function.name.clone(),
            input: crate::decode_arguments(&tc.function.arguments),
        });
    }
    AnthropicMessage {
        role: "assistant".to_string(),
        content: AnthropicContent::Blocks(blocks),
    }
}

fn to_anthropic_tool_result_message(m: &ChatMessage) -> AnthropicMessage {
    AnthropicMessage {
        role: "user".to_string(),
        content: AnthropicContent::Blocks(vec![AnthropicContentBlock::ToolResult {
            tool_use_id: m.tool_call_id.clone().unwrap_or_default(),
            content: m.content.clone(),
            is_error: false,
        }]),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnthropicResponse {
    #[serde(default)]
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) model: String,
    #[serde(default)]
    pub(crate) content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    pub(crate) stop_reason: Option<String>,
    #[serde(default)]
    pub(crate) usage: AnthropicUsage,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AnthropicUsage {
    #[serde(default)]
    pub(crate) input_tokens: u32,
    #[serde(default)]
    pub(crate) output_tokens: u32,
}

pub(crate) fn map_stop_reason(reason: &str) -> FinishReason {
    match reason {
        "tool_use" => FinishReason::ToolCalls,
        "end_turn" => FinishReason::Stop,
        "max_tokens" => FinishReason::Length,
        other => FinishReason::Other(other.to_string()),
    }
}

impl From<AnthropicResponse> for ChatResponse {
    fn from(v: AnthropicResponse) -> Self {
        let mut content = String::new();
        let mut tool_calls = Vec::new();

        for block in v.content {
            match block {
                AnthropicContentBlock::Text { text } => content.push_str(&text),
                AnthropicContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCall::new(id, name, crate::encode_arguments(&input)));
                }
                AnthropicContentBlock::ToolResult { .. } | AnthropicContentBlock::Unsupported => {}
            }
        }

        let message = ChatMessage {
            content,
            tool_calls,
            ..ChatMessage::assistant(String::new())
        };
        let usage = Usage {
            prompt_tokens: v.usage.input_tokens,
            completion_tokens: v.usage.output_tokens,
            total_tokens: v.usage.input_tokens.saturating_add(v.usage.output_tokens),
        };
        let finish_reason = map_stop_reason(v.stop_reason.as_deref().unwrap_or_default());

        ChatResponse::single(v.id, v.model, message, finish_reason, usage)
    }
}
