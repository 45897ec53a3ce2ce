use async_trait::async_trait;
use parley_llm::{
    ChatMessage, ChatProvider, ChatRequest, ChatResponse, FinishReason, LlmError, ToolCall, Usage,
};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays canned responses in order and records every request it receives.
pub struct ScriptedProvider {
    model: String,
    responses: Mutex<VecDeque<Result<ChatResponse, LlmError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<ChatResponse, LlmError>>) -> Self {
        Self {
            model: "scripted-model".to_string(),
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn create_chat(&self, req: &ChatRequest) -> Result<ChatResponse, LlmError> {
        self.requests.lock().expect("requests lock").push(req.clone());
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::InvalidInput("script exhausted".to_string())))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

pub fn usage(prompt: u32, completion: u32) -> Usage {
    Usage {
        prompt_tokens: prompt,
        completion_tokens: completion,
        total_tokens: prompt + completion,
    }
}

pub fn text_reply(text: &str) -> Result<ChatResponse, LlmError> {
    Ok(ChatResponse::single(
        "resp-text",
        "scripted-model",
        ChatMessage::assistant(text),
        FinishReason::Stop,
        usage(10, 5),
    ))
}

pub fn tool_reply(calls: &[(&str, &str, &str)]) -> Result<ChatResponse, LlmError> {
    let calls = calls
        .iter()
        .map(|(id, name, args)| ToolCall::new(*id, *name, *args))
        .collect();
    Ok(ChatResponse::single(
        "resp-tools",
        "scripted-model",
        ChatMessage::assistant_tool_calls(calls),
        FinishReason::ToolCalls,
        usage(8, 3),
    ))
}

pub fn reply_with_reason(reason: FinishReason) -> Result<ChatResponse, LlmError> {
    Ok(ChatResponse::single(
        "resp-other",
        "scripted-model",
        ChatMessage::assistant("cut off"),
        reason,
        Usage::default(),
    ))
}
