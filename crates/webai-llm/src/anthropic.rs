use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};
use webai_core::{MessageContent, Result, Role, WebAiError};

use crate::provider::*;

/// Anthropic Claude messages API provider.
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.anthropic.com/v1".into(),
        }
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        self
    }

    /// Build the `/messages` body. System messages are folded into the
    /// top-level `system` field; images become base64 `image` blocks.
    pub fn build_request_body(request: &LlmRequest) -> serde_json::Value {
        let mut system_parts: Vec<String> = request.system.iter().cloned().collect();
        let mut messages = Vec::new();

        for msg in &request.messages {
            let role = match msg.role {
                Role::System => {
                    system_parts.push(msg.text_content());
                    continue;
                }
                Role::User => "user",
                Role::Assistant => "assistant",
            };

            if msg.has_image() {
                let blocks: Vec<serde_json::Value> = msg
                    .content
                    .iter()
                    .map(|block| match block {
                        MessageContent::Text { text } => serde_json::json!({
                            "type": "text",
                            "text": text,
                        }),
                        MessageContent::Image { data, media_type } => serde_json::json!({
                            "type": "image",
                            "source": {
                                "type": "base64",
                                "media_type": media_type,
                                "data": data,
                            },
                        }),
                    })
                    .collect();
                messages.push(serde_json::json!({
                    "role": role,
                    "content": blocks,
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
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": messages,
        });

        if !system_parts.is_empty() {
            body["system"] = serde_json::json!(system_parts.join("\n\n"));
        }

        body
    }

    /// Parse a messages API reply.
    pub fn parse_response(data: &serde_json::Value) -> LlmResponse {
        let content_text = data["content"]
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .filter_map(|b| {
                        if b["type"] == "text" {
                            b["text"].as_str().map(|s| s.to_string())
                        } else {
                            None
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let usage = Usage {
            input_tokens: data["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: data["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
        };

        LlmResponse {
            message: webai_core::Message::text(Role::Assistant, content_text),
            usage,
            stop_reason: match data["stop_reason"].as_str().unwrap_or("end_turn") {
                "max_tokens" => StopReason::MaxTokens,
                "stop_sequence" => StopReason::StopSequence,
                _ => StopReason::EndTurn,
            },
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn models(&self) -> Vec<String> {
        vec![
            "claude-opus-4-20250514".into(),
            "claude-sonnet-4-20250514".into(),
            "claude-3-5-sonnet-latest".into(),
            "claude-haiku-3-5".into(),
        ]
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let body = Self::build_request_body(request);
        debug!(model = %request.model, "sending Anthropic API request");

        let resp = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| WebAiError::LlmProvider(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                return Err(WebAiError::RateLimited {
                    retry_after_secs: 30,
                });
            }
            return Err(WebAiError::LlmProvider(format!("HTTP {status}: {text}")));
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| WebAiError::LlmProvider(e.to_string()))?;

        Ok(Self::parse_response(&data))
    }

    async fn health_check(&self) -> Result<()> {
        info!("checking Anthropic API credentials");
        if self.api_key.is_empty() {
            return Err(WebAiError::LlmProvider("anthropic API key not set".into()));
        }
        Ok(())
    }
}
