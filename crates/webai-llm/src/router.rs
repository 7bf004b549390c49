use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::provider::{LlmProvider, LlmRequest, LlmResponse};
use webai_core::{Result, WebAiError};

/// Maximum retry attempts for transient errors (429, 500, 502, 503).
const MAX_RETRIES: u32 = 3;
/// Base delay for exponential backoff (doubles each retry).
const BASE_DELAY_MS: u64 = 1000;

/// Routes model requests to the correct provider, with retry and failover.
#[derive(Clone)]
pub struct ModelRouter {
    providers: Vec<Arc<dyn LlmProvider>>,
    base_delay: Duration,
}

/// Check if an error is transient and worth retrying.
fn is_retryable(err: &WebAiError) -> bool {
    match err {
        WebAiError::RateLimited { .. } => true,
        WebAiError::LlmProvider(msg) => {
            msg.starts_with("HTTP 429")
                || msg.starts_with("HTTP 500")
                || msg.starts_with("HTTP 502")
                || msg.starts_with("HTTP 503")
                || msg.starts_with("HTTP 529")
                || msg.contains("timed out")
                || msg.contains("connection reset")
                || msg.contains("connection closed")
                || msg.contains("overloaded")
        }
        _ => false,
    }
}

/// Extract the retry-after hint from a RateLimited error (in seconds).
fn retry_after_hint(err: &WebAiError) -> Option<u64> {
    if let WebAiError::RateLimited { retry_after_secs } = err {
        Some(*retry_after_secs)
    } else {
        None
    }
}

impl Default for ModelRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRouter {
    pub fn new() -> Self {
        Self {
            providers: vec![],
            base_delay: Duration::from_millis(BASE_DELAY_MS),
        }
    }

    /// Override the backoff base delay. Rate-limit hints are scaled by the
    /// same factor so tests can run with a tiny delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Register a provider.
    pub fn add_provider(&mut self, provider: Arc<dyn LlmProvider>) {
        info!(provider = provider.name(), "registered LLM provider");
        self.providers.push(provider);
    }

    pub fn providers(&self) -> &[Arc<dyn LlmProvider>] {
        &self.providers
    }

    /// Find the provider for a model string like "openai/gpt-4o".
    pub fn resolve(&self, model: &str) -> Option<(Arc<dyn LlmProvider>, String)> {
        if let Some((prefix, model_name)) = model.split_once('/') {
            for p in &self.providers {
                if p.name().eq_ignore_ascii_case(prefix) {
                    return Some((Arc::clone(p), model_name.to_string()));
                }
            }
        }
        // Bare model name: ask each provider's model list
        for p in &self.providers {
            if p.models().iter().any(|m| m == model) {
                return Some((Arc::clone(p), model.to_string()));
            }
        }
        None
    }

    /// Complete a request, retrying transient errors and failing over to
    /// `fallback_model` when the primary gives up.
    pub async fn complete(
        &self,
        request: &LlmRequest,
        fallback_model: Option<&str>,
    ) -> Result<LlmResponse> {
        let mut primary_err = None;

        if let Some((provider, model_name)) = self.resolve(&request.model) {
            let mut req = request.clone();
            req.model = model_name;

            match self.complete_with_retry(&*provider, &req).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        error = %e,
                        "primary provider failed after retries"
                    );
                    primary_err = Some(e);
                }
            }
        }

        if let Some(fallback) = fallback_model
            && let Some((provider, model_name)) = self.resolve(fallback)
        {
            info!(model = fallback, "failing over to fallback model");
            let mut req = request.clone();
            req.model = model_name;
            return self.complete_with_retry(&*provider, &req).await;
        }

        Err(primary_err.unwrap_or_else(|| WebAiError::ModelNotFound(request.model.clone())))
    }

    /// Retry a complete() call with exponential backoff on transient errors.
    async fn complete_with_retry(
        &self,
        provider: &dyn LlmProvider,
        request: &LlmRequest,
    ) -> Result<LlmResponse> {
        let mut attempt = 0;
        loop {
            match provider.complete(request).await {
                Ok(resp) => return Ok(resp),
                Err(e) if is_retryable(&e) && attempt < MAX_RETRIES => {
                    let base_ms = self.base_delay.as_millis() as u64;
                    let delay = retry_after_hint(&e)
                        .map(|s| s * base_ms)
                        .unwrap_or(base_ms * 2u64.pow(attempt));
                    warn!(
                        provider = provider.name(),
                        attempt = attempt + 1,
                        max = MAX_RETRIES,
                        delay_ms = delay,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
