//! Mock LLM provider for deterministic testing.
//!
//! Returns pre-configured replies without making any HTTP calls.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::provider::*;
use webai_core::{Message, Result, Role, WebAiError};

/// A mock LLM provider that returns queued replies in order.
///
/// # Example
/// ```
/// use webai_llm::mock::MockProvider;
/// let provider = MockProvider::new("mock")
///     .with_response(r#"{"url": "https://example.com"}"#);
/// ```
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    /// Every request received, for assertions in tests.
    pub requests: Arc<Mutex<Vec<LlmRequest>>>,
    name: String,
}

/// A pre-configured reply from the mock provider.
#[derive(Clone)]
pub struct MockResponse {
    pub text: String,
    pub stop_reason: StopReason,
    pub usage: Usage,
    /// If set, the provider returns this error instead.
    pub error: Option<MockError>,
}

/// Which error a mock reply should produce.
#[derive(Clone, Debug)]
pub enum MockError {
    Provider(String),
    RateLimited,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            text: String::new(),
            stop_reason: StopReason::EndTurn,
            usage: Usage {
                input_tokens: 100,
                output_tokens: 50,
            },
            error: None,
        }
    }
}

impl MockResponse {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn error(msg: &str) -> Self {
        Self {
            error: Some(MockError::Provider(msg.to_string())),
            ..Default::default()
        }
    }

    pub fn rate_limited() -> Self {
        Self {
            error: Some(MockError::RateLimited),
            ..Default::default()
        }
    }
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(vec![])),
            name: name.into(),
        }
    }

    /// Queue a text reply.
    pub fn with_response(self, text: &str) -> Self {
        self.responses.lock().push_back(MockResponse::text(text));
        self
    }

    /// Queue an error reply.
    pub fn with_error(self, error: &str) -> Self {
        self.responses.lock().push_back(MockResponse::error(error));
        self
    }

    /// Queue a fully custom reply.
    pub fn with_mock_response(self, resp: MockResponse) -> Self {
        self.responses.lock().push_back(resp);
        self
    }

    pub fn queue_response(&mut self, resp: MockResponse) {
        self.responses.lock().push_back(resp);
    }

    /// Shared handle to the recorded requests.
    pub fn recorded_requests(&self) -> Arc<Mutex<Vec<LlmRequest>>> {
        Arc::clone(&self.requests)
    }

    fn next_response(&self) -> MockResponse {
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| MockResponse::text("(mock: no more queued responses)"))
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn models(&self) -> Vec<String> {
        vec!["mock-vision".to_string()]
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        self.requests.lock().push(request.clone());
        let mock = self.next_response();

        match mock.error {
            Some(MockError::Provider(msg)) => return Err(WebAiError::LlmProvider(msg)),
            Some(MockError::RateLimited) => {
                return Err(WebAiError::RateLimited {
                    retry_after_secs: 1,
                });
            }
            None => {}
        }

        Ok(LlmResponse {
            message: Message::text(Role::Assistant, mock.text),
            usage: mock.usage,
            stop_reason: mock.stop_reason,
        })
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
