//! Provider seam for streaming LLM completions.

pub mod openai;

use anyhow::Result;
use async_trait::async_trait;
use std::pin::Pin;
use tokio_stream::Stream;

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Content deltas in model order. Ends when the provider signals
/// completion; errors surface in-band and terminate the stream.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn provider_id(&self) -> &str;

    /// Open a token-by-token completion stream. An error here means the
    /// request was rejected before any tokens flowed.
    async fn stream_generate(&self, request: GenerateRequest) -> Result<TokenStream>;
}
