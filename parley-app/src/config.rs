//! `parley` configuration loader.

use parley_agent::AgentConfig;
use parley_llm::{Provider, detect_provider};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant with access to weather data, \
a calculator and a fact database. Use them when needed.";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParleyConfig {
    pub general: GeneralConfig,
    pub keys: KeysConfig,
    pub agent: AgentConfig,
}

impl Default for ParleyConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            keys: KeysConfig::default(),
            agent: AgentConfig {
                system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
                ..AgentConfig::default()
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub model: String,
    /// Overrides detection from the model name: `openai`, `openrouter`, `anthropic`, `gemini`.
    pub provider: Option<String>,
    /// Points the adapter at a compatible server, e.g. a local Ollama.
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            provider: None,
            base_url: None,
            timeout_secs: parley_llm::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    pub openai_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
}

impl ParleyConfig {
    /// Reads `path` (or `~/.parley/config.toml`) and applies environment overrides. A missing
    /// file is not an error. Callers apply CLI overrides, then call [`ParleyConfig::validate`].
    pub async fn load(path: Option<PathBuf>) -> anyhow::Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok()).await
    }

    pub async fn load_with(
        path: Option<PathBuf>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let path = path.unwrap_or_else(default_config_path);
        let mut cfg = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => toml::from_str(&contents)
                .map_err(|e| anyhow::anyhow!("parse config {}: {e}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found; using defaults");
                ParleyConfig::default()
            }
            Err(e) => return Err(anyhow::anyhow!("read config {}: {e}", path.display())),
        };

        cfg.apply_overrides(lookup);
        Ok(cfg)
    }

    /// Applies `PARLEY_*` and vendor key variables. Blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("PARLEY_MODEL") {
            self.general.model = v;
        }
        if let Some(v) = get("PARLEY_PROVIDER") {
            self.general.provider = Some(v);
        }
        if let Some(v) = get("PARLEY_BASE_URL") {
            self.general.base_url = Some(v);
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.keys.openai_api_key = Some(v);
        }
        if let Some(v) = get("OPENROUTER_API_KEY") {
            self.keys.openrouter_api_key = Some(v);
        }
        if let Some(v) = get("ANTHROPIC_API_KEY") {
            self.keys.anthropic_api_key = Some(v);
        }
        if let Some(v) = get("GEMINI_API_KEY") {
            self.keys.gemini_api_key = Some(v);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.general.model.trim().is_empty() {
            return Err(anyhow::anyhow!("general.model is required"));
        }
        if self.general.timeout_secs == 0 {
            return Err(anyhow::anyhow!("general.timeout_secs must be > 0"));
        }
        let provider = self.provider()?;
        if let Some(t) = self.agent.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(anyhow::anyhow!("agent.temperature must be within 0.0..=2.0"));
            }
        }
        if self.agent.max_tool_rounds == 0 {
            return Err(anyhow::anyhow!("agent.max_tool_rounds must be > 0"));
        }
        // Local OpenAI-compatible servers run without a key.
        let keyless_ok = provider == Provider::OpenAI && self.general.base_url.is_some();
        if self.api_key().is_none() && !keyless_ok {
            return Err(anyhow::anyhow!(
                "no API key for provider {provider}; set {}",
                provider.api_key_env()
            ));
        }
        Ok(())
    }

    pub fn provider(&self) -> anyhow::Result<Provider> {
        match self.general.provider.as_deref() {
            Some(p) => Ok(p.parse()?),
            None => Ok(detect_provider(&self.general.model)),
        }
    }

    pub fn api_key(&self) -> Option<String> {
        let key = match self.provider().ok()? {
            Provider::OpenAI => &self.keys.openai_api_key,
            Provider::OpenRouter => &self.keys.openrouter_api_key,
            Provider::Anthropic => &self.keys.anthropic_api_key,
            Provider::Gemini => &self.keys.gemini_api_key,
        };
        key.clone().filter(|s| !s.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.general.timeout_secs)
    }
}

pub fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".parley").join("config.toml")
}
