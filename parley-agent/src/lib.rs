//! Multi-turn conversation loop over any [`parley_llm::ChatProvider`].
//!
//! See [`Agent`] for the request / tool-round cycle.

mod agent;
mod config;
mod error;
mod observer;

pub use agent::{Agent, AgentBuilder};
pub use config::{AgentConfig, DEFAULT_MAX_TOOL_ROUNDS, DEFAULT_TEMPERATURE};
pub use error::{AgentError, Result};
pub use observer::{DebugObserver, NoopObserver, Observer};

pub use tokio_util::sync::CancellationToken;
