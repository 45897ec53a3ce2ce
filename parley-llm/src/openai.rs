//! OpenAI-compatible chat completions. The canonical model already matches this wire format,
//! so the adapter only does transport.

use crate::error::Result;
use crate::provider::ChatProvider;
use crate::transport::{HttpTransport, TransportConfig};
use crate::types::{ChatRequest, ChatResponse};
use async_trait::async_trait;
use std::time::Duration;

const VENDOR: &str = "openai";
const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const CEREBRAS_BASE_URL: &str = "https://api.cerebras.ai/v1";
pub const FIREWORKS_BASE_URL: &str = "https://api.fireworks.ai/inference/v1";
pub const TOGETHER_BASE_URL: &str = "https://api.together.xyz/v1";
pub const ANYSCALE_BASE_URL: &str = "https://api.endpoints.anyscale.com/v1";

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";
pub const MISTRAL_BASE_URL: &str = "https://api.mistral.ai/v1";
pub const MOONSHOT_BASE_URL: &str = "https://api.moonshot.ai/v1";
pub const DASHSCOPE_BASE_URL: &str = "https://dashscope-intl.aliyuncs.com/compatible-mode/v1";
pub const ZAI_BASE_URL: &str = "https://api.z.ai/v1";

#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    model: String,
    config: TransportConfig,
    transport: HttpTransport,
}

impl OpenAiClient {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self::with_config(api_key, model, TransportConfig::new(DEFAULT_BASE_URL))
    }

    /// Same as [`OpenAiClient::new`] pointed at OpenRouter.
    pub fn open_router(api_key: &str, model: &str) -> Self {
        Self::new(api_key, model).with_base_url(OPENROUTER_BASE_URL)
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
impl ChatProvider for OpenAiClient {
    #[tracing::instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn create_chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let auth = format!("Bearer {}", self.api_key);
        let mut headers = Vec::new();
        // Local servers such as Ollama run without a key.
        if !self.api_key.is_empty() {
            headers.push(("authorization", auth.as_str()));
        }

        let body = self
            .transport
            .post_json(CHAT_COMPLETIONS_PATH, &headers, req)
            .await?;
        let resp: ChatResponse = self.transport.decode(&body)?;
        tracing::debug!(
            choices = resp.choices.len(),
            prompt_tokens = resp.usage.prompt_tokens,
            completion_tokens = resp.usage.completion_tokens,
            "openai chat completed"
        );
        Ok(resp)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
