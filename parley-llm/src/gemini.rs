//! Google Gemini `generateContent` adapter.
//!
//! Gemini reports `STOP` even when the model asks for function calls, so tool intent is
//! decided by inspecting the returned parts. It also omits call ids, which are synthesized
//! here so tool results can be linked back.

use crate::error::Result;
use crate::provider::ChatProvider;
use crate::transport::{HttpTransport, TransportConfig};
use crate::types::{
    ChatMessage, ChatRequest, ChatResponse, FinishReason, Role, Tool, ToolCall, Usage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const VENDOR: &str = "gemini";
const SYSTEM_INSTRUCTION_ROLE: &str = "user";
const TOOL_RESULT_KEY: &str = "return_value";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const CALL_ID_PREFIX: &str = "call_";
const CALL_ID_HEX_LEN: usize = 24;

#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    config: TransportConfig,
    transport: HttpTransport,
}

impl GeminiClient {
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

    fn generate_path(&self) -> String {
        format!("/v1beta/models/{}:generateContent", self.model)
    }
}

#[async_trait]
impl ChatProvider for GeminiClient {
    #[tracing::instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn create_chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let native = GeminiRequest::from_canonical(req);
        let headers = [("x-goog-api-key", self.api_key.as_str())];

        let body = self
            .transport
            .post_json(&self.generate_path(), &headers, &native)
            .await?;
        let parsed: GeminiResponse = self.transport.decode(&body)?;
        let resp = ChatResponse::from(parsed);
        tracing::debug!(
            choices = resp.choices.len(),
            prompt_tokens = resp.usage.prompt_tokens,
            completion_tokens = resp.usage.completion_tokens,
            "gemini chat completed"
        );
        Ok(resp)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiRequest {
    pub(crate) contents: Vec<GeminiContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) system_instruction: Option<GeminiContent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) tools: Vec<GeminiTool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) generation_config: Option<GenerationConfig>,
}

impl GeminiRequest {
    pub(crate) fn from_canonical(req: &ChatRequest) -> Self {
        let mut system_instruction: Option<GeminiContent> = None;
        let mut contents = Vec::with_capacity(req.messages.len());

        for m in &req.messages {
            match m.role {
                Role::System => system_instruction
                    .get_or_insert_with(|| GeminiContent {
                        role: SYSTEM_INSTRUCTION_ROLE.to_string(),
                        parts: Vec::new(),
                    })
                    .parts
                    .push(GeminiPart::text(&m.content)),
                Role::User => contents.push(GeminiContent {
                    role: "user".to_string(),
                    parts: vec![GeminiPart::text(&m.content)],
                }),
                Role::Assistant => contents.push(to_gemini_model_content(m)),
                Role::Tool => contents.push(to_gemini_function_response(m)),
            }
        }

        let tools = if req.tools.is_empty() {
            Vec::new()
        } else {
            vec![GeminiTool {
                function_declarations: req.tools.iter().map(FunctionDeclaration::from).collect(),
            }]
        };

        Self {
            contents,
            system_instruction,
            tools,
            generation_config: GenerationConfig::from_request(req),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GeminiContent {
    #[serde(default)]
    pub(crate) role: String,
    #[serde(default)]
    pub(crate) parts: Vec<GeminiPart>,
}

/// One part of a turn. Exactly one field is set on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) function_call: Option<GeminiFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) function_response: Option<GeminiFunctionResponse>,
    /// Set on reasoning summaries; those parts are not part of the answer.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) thought: bool,
}

impl GeminiPart {
    fn text(s: &str) -> Self {
        Self {
            text: Some(s.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GeminiFunctionCall {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) args: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GeminiFunctionResponse {
    pub(crate) name: String,
    pub(crate) response: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) id: Option<String>,
}

fn to_gemini_model_content(m: &ChatMessage) -> GeminiContent {
    let mut parts = Vec::with_capacity(m.tool_calls.len() + 1);
    if m.tool_calls.is_empty() || !m.content.is_empty() {
        parts.push(GeminiPart::text(&m.content));
    }
    for tc in &m.tool_calls {
        parts.push(GeminiPart {
            function_call: Some(GeminiFunctionCall {
                name: tc.function.name.clone(),
                args: crate::decode_arguments(&tc.function.arguments),
            }),
            ..GeminiPart::default()
        });
    }
    GeminiContent {
        role: "model".to_string(),
        parts,
    }
}

/// Gemini rejects bare strings as function responses, so the output is wrapped in a
/// one-key object.
fn to_gemini_function_response(m: &ChatMessage) -> GeminiContent {
    GeminiContent {
        role: "user".to_string(),
        parts: vec![GeminiPart {
            function_response: Some(GeminiFunctionResponse {
                name: m.name.clone().unwrap_or_default(),
                response: serde_json::json!({ TOOL_RESULT_KEY: m.content }),
                id: m.tool_call_id.clone(),
            }),
            ..GeminiPart::default()
        }],
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiTool {
    pub(crate) function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct FunctionDeclaration {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) parameters: Option<serde_json::Value>,
}

impl From<&Tool> for FunctionDeclaration {
    fn from(t: &Tool) -> Self {
        Self {
            name: t.function.name.clone(),
            description: t.function.description.clone(),
            parameters: Some(t.function.parameters.clone()),
        }
    }
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) stop_sequences: Vec<String>,
}

impl GenerationConfig {
    /// `None` when every parameter is left at its default, so the field is omitted.
    fn from_request(req: &ChatRequest) -> Option<Self> {
        let non_zero = |v: Option<f64>| v.filter(|x| *x != 0.0);
        let config = Self {
            temperature: non_zero(req.temperature),
            top_p: non_zero(req.top_p),
            max_output_tokens: req.max_tokens.filter(|n| *n != 0),
            stop_sequences: req.stop.clone(),
        };
        (config != Self::default()).then_some(config)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiResponse {
    #[serde(default)]
    pub(crate) candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    pub(crate) usage_metadata: Option<GeminiUsage>,
    #[serde(default)]
    pub(crate) model_version: String,
    #[serde(default)]
    pub(crate) response_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiCandidate {
    #[serde(default)]
    pub(crate) content: Option<GeminiContent>,
    #[serde(default)]
    pub(crate) finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiUsage {
    #[serde(default)]
    pub(crate) prompt_token_count: u32,
    #[serde(default)]
    pub(crate) candidates_token_count: u32,
    #[serde(default)]
    pub(crate) total_token_count: u32,
    #[serde(default)]
    pub(crate) thoughts_token_count: u32,
}

pub(crate) fn generate_call_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("{CALL_ID_PREFIX}{}", &hex[..CALL_ID_HEX_LEN])
}

/// Maps Gemini's finish reason once tool intent has been ruled out.
pub(crate) fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
            FinishReason::ContentFilter
        }
        other => FinishReason::Other(other.to_string()),
    }
}

impl From<GeminiResponse> for ChatResponse {
    fn from(v: GeminiResponse) -> Self {
        let usage = v
            .usage_metadata
            .map(|u| Usage {
                prompt_tokens: u.prompt_token_count,
                // Thinking tokens are billed as output but reported separately.
                completion_tokens: u
                    .candidates_token_count
                    .saturating_add(u.thoughts_token_count),
                total_tokens: u.total_token_count,
            })
            .unwrap_or_default();

        let Some(candidate) = v.candidates.into_iter().next() else {
            return ChatResponse {
                id: v.response_id,
                model: v.model_version,
                choices: Vec::new(),
                usage,
            };
        };

        let mut content = String::new();
        let mut tool_calls = Vec::new();
        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            if let Some(text) = part.text.filter(|_| !part.thought) {
                content.push_str(&text);
            }
            if let Some(call) = part.function_call {
                tool_calls.push(ToolCall::new(
                    generate_call_id(),
                    call.name,
                    crate::encode_arguments(&call.args),
                ));
            }
        }

        // The vendor reason is not trusted for tool intent.
        let finish_reason = if tool_calls.is_empty() {
            map_finish_reason(candidate.finish_reason.as_deref().unwrap_or_default())
        } else {
            FinishReason::ToolCalls
        };

        let message = ChatMessage {
            content,
            tool_calls,
            ..ChatMessage::assistant(String::new())
        };
        ChatResponse::single(v.response_id, v.model_version, message, finish_reason, usage)
    }
}
