//! Hooks for watching an agent's provider and tool traffic.

use parley_llm::{ChatRequest, ChatResponse};
use parley_tools::ToolError;
use std::time::Duration;

/// Receives a callback around every provider request and tool invocation. All methods
/// default to no-ops; observers cannot change what the agent does.
pub trait Observer: Send + Sync {
    fn on_llm_request(&self, _req: &ChatRequest) {}

    fn on_llm_response(&self, _resp: &ChatResponse, _elapsed: Duration) {}

    fn on_tool_call(&self, _name: &str, _arguments: &str) {}

    fn on_tool_result(&self, _name: &str, _result: Result<&str, &ToolError>, _elapsed: Duration) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {}

/// Logs requests and responses as pretty JSON at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct DebugObserver;

fn pretty<T: serde::Serialize>(v: &T) -> String {
    serde_json::to_string_pretty(v).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}

impl Observer for DebugObserver {
    fn on_llm_request(&self, req: &ChatRequest) {
        tracing::debug!(
            model = %req.model,
            messages = req.messages.len(),
            tools = req.tools.len(),
            request = %pretty(req),
            "llm request"
        );
    }

    fn on_llm_response(&self, resp: &ChatResponse, elapsed: Duration) {
        tracing::debug!(
            latency_ms = elapsed.as_millis() as u64,
            response = %pretty(resp),
            "llm response"
        );
    }

    fn on_tool_call(&self, name: &str, arguments: &str) {
        tracing::debug!(tool_name = name, arguments, "tool call");
    }

    fn on_tool_result(&self, name: &str, result: Result<&str, &ToolError>, elapsed: Duration) {
        let latency_ms = elapsed.as_millis() as u64;
        match result {
            Ok(output) => tracing::debug!(tool_name = name, latency_ms, output, "tool result"),
            Err(e) => tracing::debug!(tool_name = name, latency_ms, error = %e, "tool failed"),
        }
    }
}
