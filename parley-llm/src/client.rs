use crate::anthropic::AnthropicClient;
use crate::error::{LlmError, Result};
use crate::gemini::GeminiClient;
use crate::openai::{OPENROUTER_BASE_URL, OpenAiClient};
use crate::provider::ChatProvider;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Longest tool name every supported vendor accepts.
pub const MAX_TOOL_NAME_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    OpenRouter,
    Anthropic,
    Gemini,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::OpenRouter => "openrouter",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        }
    }

    /// Environment variable conventionally holding this provider's key.
    pub fn api_key_env(self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::OpenRouter => "OPENROUTER_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "openrouter" => Ok(Self::OpenRouter),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "gemini" | "google" => Ok(Self::Gemini),
            other => Err(LlmError::InvalidInput(format!("unknown provider: {other}"))),
        }
    }
}

pub fn detect_provider(model: &str) -> Provider {
    let m = model.to_ascii_lowercase();
    if m.starts_with("claude-") {
        return Provider::Anthropic;
    }
    if m.starts_with("gemini-") {
        return Provider::Gemini;
    }
    Provider::OpenAI
}

/// Builds the adapter for `provider`. An empty `base_url` keeps the vendor default.
#[tracing::instrument(level = "debug", skip(api_key))]
pub fn build_provider(
    provider: Provider,
    api_key: &str,
    model: &str,
    base_url: Option<&str>,
    timeout: Duration,
) -> Arc<dyn ChatProvider> {
    let base_url = base_url.filter(|u| !u.trim().is_empty());
    match provider {
        Provider::OpenAI | Provider::OpenRouter => {
            let default = match provider {
                Provider::OpenRouter => Some(OPENROUTER_BASE_URL),
                _ => None,
            };
            let mut c = OpenAiClient::new(api_key, model).with_timeout(timeout);
            if let Some(url) = base_url.or(default) {
                c = c.with_base_url(url);
            }
            Arc::new(c)
        }
        Provider::Anthropic => {
            let mut c = AnthropicClient::new(api_key, model).with_timeout(timeout);
            if let Some(url) = base_url {
                c = c.with_base_url(url);
            }
            Arc::new(c)
        }
        Provider::Gemini => {
            let mut c = GeminiClient::new(api_key, model).with_timeout(timeout);
            if let Some(url) = base_url {
                c = c.with_base_url(url);
            }
            Arc::new(c)
        }
    }
}

/// Checks a tool name against the strictest vendor rules: 1 to 64 ASCII letters, digits,
/// underscores or hyphens.
pub fn validate_tool_name_all_providers(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(LlmError::InvalidInput("tool name is empty".to_string()));
    }
    if name.len() > MAX_TOOL_NAME_LEN {
        return Err(LlmError::InvalidInput(format!(
            "tool name {name:?} exceeds {MAX_TOOL_NAME_LEN} characters"
        )));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(LlmError::InvalidInput(format!(
            "tool name {name:?} contains invalid character {bad:?}"
        )));
    }
    Ok(())
}
