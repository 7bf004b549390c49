use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};
use webai_core::{MessageContent, Result, Role, WebAiError};

use crate::provider::*;

/// OpenAI-compatible chat completions provider (OpenAI, Azure, vLLM, ...).
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    provider_name: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: "https://api.openai.com/v1".into(),
            provider_name: "openai".into(),
        }
    }

    /// Use a custom base URL for an OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, url: String, name: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self.provider_name = name;
        self
    }

    /// Bound every request to `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        self
    }

    /// Build the `/chat/completions` body. Images become `image_url` parts
    /// carrying a base64 data URL.
    pub fn build_request_body(request: &LlmRequest) -> serde_json::Value {
        let mut messages = Vec::new();

        if let Some(ref system) = request.system {
            messages.push(serde_json::json!({
                "role": "system",
                "content": system,
            }));
        }

        for msg in &request.messages {
            let role = match msg.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            };

            if msg.has_image() {
                let parts: Vec<serde_json::Value> = msg
                    .content
                    .iter()
                    .map(|block| match block {
                        MessageContent::Text { text } => serde_json::json!({
                            "type": "text",
                            "text": text,
                        }),
                        MessageContent::Image { .. } => serde_json::json!({
                            "type": "image_url",
                            "image_url": { "url": block.data_url().unwrap_or_default() },
                        }),
                    })
                    .collect();
                messages.push(serde_json::json!({
                    "role": role,
                    "content": parts,
                }));
            } else {
                messages.push(serde_json::json!({
                    "role": role,
                    "content": msg.text_content(),
                }));
            }
        }

        let mut body = serde_json::json!({
            "model": &request.model,
            "temperature": request.temperature,
            "messages": messages,
        });

        // Newer OpenAI models (o1, o3, gpt-5, …) require max_completion_tokens
        if uses_max_completion_tokens(&request.model) {
            body["max_completion_tokens"] = serde_json::json!(request.max_tokens);
        } else {
            body["max_tokens"] = serde_json::json!(request.max_tokens);
        }

        body
    }

    /// Parse a chat completions reply.
    pub fn parse_response(data: &serde_json::Value) -> LlmResponse {
        let choice = &data["choices"][0];
        let content = choice["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();

        let usage_data = &data["usage"];
        let usage = Usage {
            input_tokens: usage_data["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: usage_data["completion_tokens"].as_u64().unwrap_or(0) as u32,
        };

        LlmResponse {
            message: webai_core::Message::text(Role::Assistant, content),
            usage,
            stop_reason: match choice["finish_reason"].as_str().unwrap_or("") {
                "length" => StopReason::MaxTokens,
                "content_filter" => StopReason::ContentFilter,
                _ => StopReason::EndTurn,
            },
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn models(&self) -> Vec<String> {
        vec![
            "gpt-4o".into(),
            "gpt-4o-mini".into(),
            "gpt-4-turbo".into(),
            "gpt-4.1".into(),
            "o3".into(),
        ]
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let body = Self::build_request_body(request);
        debug!(model = %request.model, messages = request.messages.len(), "sending OpenAI request");

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| WebAiError::LlmProvider(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                return Err(WebAiError::RateLimited {
                    retry_after_secs: 20,
                });
            }
            return Err(WebAiError::LlmProvider(format!("HTTP {status}: {text}")));
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| WebAiError::LlmProvider(e.to_string()))?;

        if let Some(err) = data["error"]["message"].as_str() {
            return Err(WebAiError::LlmProvider(err.to_string()));
        }

        Ok(Self::parse_response(&data))
    }

    async fn health_check(&self) -> Result<()> {
        info!(provider = self.provider_name, "checking API credentials");
        if self.api_key.is_empty() {
            return Err(WebAiError::LlmProvider(format!(
                "{} API key not set",
                self.provider_name
            )));
        }
        Ok(())
    }
}

/// Returns true for models that require `max_completion_tokens` instead of `max_tokens`.
fn uses_max_completion_tokens(model: &str) -> bool {
    let m = model.to_lowercase();
    m.starts_with("o1")
        || m.starts_with("o3")
        || m.starts_with("o4")
        || m.contains("gpt-5")
        || m.contains("gpt5")
}
