use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use webai_core::{Message, Result};

/// A request to an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// The model to use, e.g. "gpt-4o" (provider-specific part).
    pub model: String,
    /// Conversation history. User turns may carry screenshots.
    pub messages: Vec<Message>,
    /// System prompt (separate from messages for providers that support it).
    pub system: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A complete response from an LLM.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub message: Message,
    pub usage: Usage,
    pub stop_reason: StopReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    ContentFilter,
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    pub fn merge(&mut self, other: &Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Trait implemented by each LLM provider (OpenAI, Anthropic, mock).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Lowercase routing name, e.g. "openai", "anthropic".
    fn name(&self) -> &str;

    /// List known vision-capable models.
    fn models(&self) -> Vec<String>;

    /// Send a request and wait for the full reply.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;

    /// Check if this provider is usable (credentials present).
    async fn health_check(&self) -> Result<()>;
}
