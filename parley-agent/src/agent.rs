use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::observer::{NoopObserver, Observer};
use parley_llm::{ChatMessage, ChatProvider, ChatRequest, FinishReason, ToolCall, Usage};
use parley_tools::{JsonSchema, RegistrationError, ToolOutput, ToolRegistry};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// One conversation with one provider.
///
/// The agent owns the history and the tool registry. Each [`Agent::run`] appends the user
/// turn, then alternates provider calls and tool rounds until the model answers with text.
pub struct Agent {
    provider: Arc<dyn ChatProvider>,
    registry: ToolRegistry,
    config: AgentConfig,
    observer: Arc<dyn Observer>,
    history: Vec<ChatMessage>,
    usage_totals: Usage,
}

pub struct AgentBuilder {
    provider: Arc<dyn ChatProvider>,
    registry: ToolRegistry,
    config: AgentConfig,
    observer: Arc<dyn Observer>,
}

impl AgentBuilder {
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    pub fn top_p(mut self, top_p: f64) -> Self {
        self.config.top_p = Some(top_p);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = Some(max_tokens);
        self
    }

    pub fn stop(mut self, stop: Vec<String>) -> Self {
        self.config.stop = stop;
        self
    }

    pub fn max_tool_rounds(mut self, rounds: usize) -> Self {
        self.config.max_tool_rounds = rounds;
        self
    }

    pub fn tools(mut self, registry: ToolRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn build(self) -> Agent {
        let mut agent = Agent {
            provider: self.provider,
            registry: self.registry,
            config: self.config,
            observer: self.observer,
            history: Vec::new(),
            usage_totals: Usage::default(),
        };
        agent.seed_history();
        agent
    }
}

impl Agent {
    pub fn builder(provider: Arc<dyn ChatProvider>) -> AgentBuilder {
        AgentBuilder {
            provider,
            registry: ToolRegistry::new(),
            config: AgentConfig::default(),
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self::builder(provider).build()
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Token usage summed over every provider call since creation or the last reset.
    pub fn usage_totals(&self) -> Usage {
        self.usage_totals
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Drops the conversation, keeping only the system prompt.
    pub fn reset(&mut self) {
        self.history.clear();
        self.usage_totals = Usage::default();
        self.seed_history();
    }

    pub fn register_tool<A, R, F>(
        &mut self,
        name: &str,
        description: &str,
        f: F,
    ) -> std::result::Result<Option<String>, RegistrationError>
    where
        A: DeserializeOwned + Serialize + Default + JsonSchema + Send + 'static,
        R: ToolOutput,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        self.registry.register(name, description, f)
    }

    pub fn register_tool_async<A, R, F, Fut>(
        &mut self,
        name: &str,
        description: &str,
        f: F,
    ) -> std::result::Result<Option<String>, RegistrationError>
    where
        A: DeserializeOwned + Serialize + Default + JsonSchema + Send + 'static,
        R: ToolOutput + Send,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        self.registry.register_async(name, description, f)
    }

    fn seed_history(&mut self) {
        if let Some(prompt) = self.config.system_prompt.as_deref() {
            self.history.push(ChatMessage::system(prompt));
        }
    }

    pub async fn run(&mut self, message: &str) -> Result<String> {
        self.run_with_cancel(&CancellationToken::new(), message).await
    }

    /// Like [`Agent::run`], but returns [`AgentError::Cancelled`] as soon as `cancel` fires.
    /// A tool round is committed to history only once every call in it has a result.
    #[tracing::instrument(level = "info", skip_all, fields(model = %self.provider.model_name()))]
    pub async fn run_with_cancel(
        &mut self,
        cancel: &CancellationToken,
        message: &str,
    ) -> Result<String> {
        tracing::info!(
            prior_history_messages = self.history.len(),
            tools_registered = self.registry.len(),
            "agent run started"
        );
        if !message.is_empty() {
            self.history.push(ChatMessage::user(message));
        }

        let provider = Arc::clone(&self.provider);
        let mut tool_rounds = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }

            let request = self.build_request();
            self.observer.on_llm_request(&request);

            let llm_started = Instant::now();
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!(tool_rounds, "agent run cancelled during provider call");
                    return Err(AgentError::Cancelled);
                }
                resp = provider.create_chat(&request) => resp?,
            };
            let elapsed = llm_started.elapsed();
            self.observer.on_llm_response(&response, elapsed);

            self.usage_totals.accumulate(response.usage);
            tracing::info!(
                tool_round = tool_rounds,
                latency_ms = elapsed.as_millis() as u64,
                prompt_tokens = response.usage.prompt_tokens,
                completion_tokens = response.usage.completion_tokens,
                choices = response.choices.len(),
                "agent llm call completed"
            );

            let Some(choice) = response.choices.into_iter().next() else {
                tracing::error!("provider returned no choices");
                return Err(AgentError::NoChoices);
            };

            match choice.finish_reason {
                FinishReason::Stop => {
                    let content = choice.message.content;
                    self.history.push(ChatMessage::assistant(content.clone()));
                    tracing::info!(
                        response_len = content.len(),
                        history_messages = self.history.len(),
                        "agent run completed"
                    );
                    return Ok(content);
                }
                FinishReason::ToolCalls => {
                    tool_rounds += 1;
                    if tool_rounds > self.config.max_tool_rounds {
                        tracing::error!(
                            max_tool_rounds = self.config.max_tool_rounds,
                            "agent tool round limit reached"
                        );
                        return Err(AgentError::ToolRoundLimit(self.config.max_tool_rounds));
                    }
                    let staged = self
                        .execute_tool_calls(cancel, choice.message.tool_calls)
                        .await?;
                    self.history.extend(staged);
                }
                other => {
                    tracing::warn!(finish_reason = %other, "unexpected finish reason");
                    return Err(AgentError::UnexpectedFinishReason(other));
                }
            }
        }
    }

    fn build_request(&self) -> ChatRequest {
        ChatRequest {
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            max_tokens: self.config.max_tokens,
            stop: self.config.stop.clone(),
            tools: self.registry.tools(),
            ..ChatRequest::new(self.provider.model_name(), self.history.clone())
        }
    }

    /// Runs each call in order and returns the assistant turn followed by one result
    /// message per call.
    async fn execute_tool_calls(
        &self,
        cancel: &CancellationToken,
        calls: Vec<ToolCall>,
    ) -> Result<Vec<ChatMessage>> {
        tracing::info!(tool_calls = calls.len(), "agent received tool calls");
        let mut staged = Vec::with_capacity(calls.len() + 1);
        staged.push(ChatMessage::assistant_tool_calls(calls.clone()));

        for call in calls {
            if cancel.is_cancelled() {
                tracing::warn!(
                    tool_call_id = %call.id,
                    "agent run cancelled between tool calls; discarding round"
                );
                return Err(AgentError::Cancelled);
            }

            let name = call.name();
            self.observer.on_tool_call(name, call.arguments());
            let started = Instant::now();
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!(
                        tool_call_id = %call.id,
                        tool_name = name,
                        "agent run cancelled during tool call; discarding round"
                    );
                    return Err(AgentError::Cancelled);
                }
                r = self.registry.execute(name, call.arguments()) => r,
            };
            let elapsed = started.elapsed();
            self.observer.on_tool_result(name, result.as_deref(), elapsed);

            let msg = match result {
                Ok(output) => {
                    tracing::info!(
                        tool_call_id = %call.id,
                        tool_name = name,
                        latency_ms = elapsed.as_millis() as u64,
                        output_len = output.len(),
                        "tool call completed"
                    );
                    ChatMessage::tool_result(&call.id, name, output)
                }
                Err(e) => {
                    tracing::warn!(
                        tool_call_id = %call.id,
                        tool_name = name,
                        latency_ms = elapsed.as_millis() as u64,
                        error = %e,
                        "tool call failed"
                    );
                    ChatMessage::tool_error(&call.id, name, &e)
                }
            };
            staged.push(msg);
        }
        Ok(staged)
    }
}
