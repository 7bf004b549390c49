//! # webai-llm
//!
//! Abstraction over vision-capable LLM providers. Requests carry
//! screenshots as image content blocks; the router adds retry and
//! failover between providers.

pub mod anthropic;
pub mod mock;
pub mod openai;
pub mod provider;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use mock::MockProvider;
pub use openai::OpenAiProvider;
pub use provider::{LlmProvider, LlmRequest, LlmResponse, StopReason, Usage};
pub use router::ModelRouter;
