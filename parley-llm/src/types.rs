//! Canonical chat/tool-calling model.
//!
//! The serde shape of these types is the OpenAI chat-completions wire format, so the
//! passthrough adapter can send and receive them without translation.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON object encoded as a string.
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: function_kind(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    pub fn arguments(&self) -> &str {
        &self.function.arguments
    }
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Assistant turn requesting tool calls. Content is always empty; callers that want
    /// text alongside the calls set `content` themselves.
    pub fn assistant_tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::with_role(Role::Assistant, String::new())
        }
    }

    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            tool_call_id: Some(tool_call_id.into()),
            ..Self::with_role(Role::Tool, output)
        }
    }

    /// Tool turn reporting a failed execution back to the model so it can correct itself.
    pub fn tool_error(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        err: &dyn std::fmt::Display,
    ) -> Self {
        Self::tool_result(
            tool_call_id,
            name,
            format!("Error executing tool: {err}. Please fix your arguments."),
        )
    }
}

/// OpenAI returns `"content": null` on tool-call turns.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDescription {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// JSON Schema describing the arguments object.
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionDescription,
}

impl Tool {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            kind: function_kind(),
            function: FunctionDescription {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    /// `"auto"`, `"none"`, or a vendor-specific object forcing one tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<serde_json::Value>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            ..Self::default()
        }
    }
}

/// Normalized completion reason. The agent branches on this value only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    ContentFilter,
    /// Vendor value with no canonical counterpart, kept verbatim.
    Other(String),
}

impl FinishReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stop => "stop",
            Self::ToolCalls => "tool_calls",
            Self::Length => "length",
            Self::ContentFilter => "content_filter",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for FinishReason {
    fn from(s: String) -> Self {
        match s.as_str() {
            "stop" => Self::Stop,
            "tool_calls" => Self::ToolCalls,
            "length" => Self::Length,
            "content_filter" => Self::ContentFilter,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for FinishReason {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<FinishReason> for String {
    fn from(r: FinishReason) -> Self {
        match r {
            FinishReason::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for FinishReason {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl Usage {
    /// Adds `other` field by field, saturating at `u32::MAX`.
    pub fn accumulate(&mut self, other: Usage) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(other.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ChatMessage,
    #[serde(default, deserialize_with = "null_as_default")]
    pub finish_reason: FinishReason,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Usage,
}

impl ChatResponse {
    /// Wraps a single assistant message the way vendors without a `choices` array need.
    pub fn single(
        id: impl Into<String>,
        model: impl Into<String>,
        message: ChatMessage,
        finish_reason: FinishReason,
        usage: Usage,
    ) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            choices: vec![Choice {
                index: 0,
                message,
                finish_reason,
            }],
            usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_result_stamps_call_id_and_name() {
        let m = ChatMessage::tool_result("call_1", "get_weather", "Sunny");
        assert_eq!(m.role, Role::Tool);
        assert_eq!(m.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(m.name.as_deref(), Some("get_weather"));
        assert_eq!(m.content, "Sunny");
    }

    #[test]
    fn tool_error_wraps_error_text() {
        let m = ChatMessage::tool_error("call_2", "calc", &"boom");
        assert_eq!(m.tool_call_id.as_deref(), Some("call_2"));
        assert_eq!(
            m.content,
            "Error executing tool: boom. Please fix your arguments."
        );
    }

    #[test]
    fn tool_call_message_has_no_content() {
        let m = ChatMessage::assistant_tool_calls(vec![ToolCall::new("a", "f", "{}")]);
        assert_eq!(m.role, Role::Assistant);
        assert!(m.content.is_empty());
        assert_eq!(m.tool_calls.len(), 1);
    }

    #[test]
    fn finish_reason_passes_unknown_values_through() {
        assert_eq!(FinishReason::from("stop"), FinishReason::Stop);
        assert_eq!(FinishReason::from("tool_calls"), FinishReason::ToolCalls);
        assert_eq!(
            FinishReason::from("weird"),
            FinishReason::Other("weird".to_string())
        );
        assert_eq!(String::from(FinishReason::ContentFilter), "content_filter");
    }

    #[test]
    fn openai_response_with_null_content_decodes() {
        let body = json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "get_weather", "arguments": "{\"city\":\"Paris\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });
        let resp: ChatResponse = serde_json::from_value(body).expect("decode response");
        let choice = &resp.choices[0];
        assert_eq!(choice.finish_reason, FinishReason::ToolCalls);
        assert!(choice.message.content.is_empty());
        assert_eq!(choice.message.tool_calls[0].name(), "get_weather");
        assert_eq!(resp.usage.total_tokens, 15);
    }

    #[test]
    fn request_serializes_in_openai_shape() {
        let mut req = ChatRequest::new("gpt-4o", vec![ChatMessage::user("hi")]);
        req.tools = vec![Tool::function("f", "does f", json!({"type": "object"}))];
        req.temperature = Some(0.7);
        let v = serde_json::to_value(&req).expect("encode request");
        assert_eq!(v["model"], "gpt-4o");
        assert_eq!(v["messages"][0], json!({"role": "user", "content": "hi"}));
        assert_eq!(v["tools"][0]["type"], "function");
        assert_eq!(v["tools"][0]["function"]["name"], "f");
        assert_eq!(v["temperature"], 0.7);
        assert!(v.get("max_tokens").is_none());
        assert!(v.get("stop").is_none());
    }

    #[test]
    fn request_survives_a_wire_round_trip() {
        let call = ToolCall::new("call_1", "get_weather", r#"{"city":"Paris"}"#);
        let mut req = ChatRequest::new(
            "gpt-4o-mini",
            vec![
                ChatMessage::system("be brief"),
                ChatMessage::user("weather in Paris?"),
                ChatMessage::assistant_tool_calls(vec![call.clone()]),
                ChatMessage::tool_result("call_1", "get_weather", "Sunny, 22C"),
            ],
        );
        req.tools = vec![Tool::function(
            "get_weather",
            "Get current weather",
            json!({"type": "object", "properties": {"city": {"type": "string"}}}),
        )];

        let wire = serde_json::to_string(&req).expect("encode");
        let back: ChatRequest = serde_json::from_str(&wire).expect("decode");
        assert_eq!(back.model, req.model);
        assert_eq!(back.messages.len(), req.messages.len());
        assert_eq!(back.tools.len(), req.tools.len());
        assert_eq!(back.messages[2].tool_calls, vec![call]);
        assert_eq!(back.messages[3].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(back.messages[3].name.as_deref(), Some("get_weather"));
        assert_eq!(back, req);
    }

    #[test]
    fn usage_accumulation_saturates() {
        let mut total = Usage {
            prompt_tokens: u32::MAX - 1,
            completion_tokens: 3,
            total_tokens: u32::MAX,
        };
        total.accumulate(Usage {
            prompt_tokens: 5,
            completion_tokens: 4,
            total_tokens: 9,
        });
        assert_eq!(total.prompt_tokens, u32::MAX);
        assert_eq!(total.completion_tokens, 7);
        assert_eq!(total.total_tokens, u32::MAX);
    }
}
