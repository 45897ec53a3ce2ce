use crate::error::Result;
use crate::types::{ChatRequest, ChatResponse};
use async_trait::async_trait;

/// A chat backend. Adapters translate the canonical request into their vendor's wire format
/// and the vendor response back, so the agent never needs to know which one it holds.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn create_chat(&self, req: &ChatRequest) -> Result<ChatResponse>;

    /// Model identifier this provider was configured with.
    fn model_name(&self) -> &str;
}

#[async_trait]
impl<P: ChatProvider + ?Sized> ChatProvider for std::sync::Arc<P> {
    async fn create_chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        (**self).create_chat(req).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}
