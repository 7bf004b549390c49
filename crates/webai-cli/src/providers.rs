//! Builds the model router from `[services]`.

use std::sync::Arc;
use std::time::Duration;
use webai_config::WebAiConfig;
use webai_llm::{AnthropicProvider, ModelRouter, OpenAiProvider};

/// Register every provider that has an API key.
pub fn build_router(config: &WebAiConfig) -> ModelRouter {
    let timeout = Duration::from_secs(config.agent.request_timeout_secs);
    let services = &config.services;
    let mut router = ModelRouter::new();

    if let Some(ref key) = services.openai_api_key {
        let mut provider = OpenAiProvider::new(key.clone()).with_timeout(timeout);
        if let Some(ref url) = services.openai_base_url {
            provider = provider.with_base_url(url.clone(), "openai".into());
        }
        router.add_provider(Arc::new(provider));
    }
    if let Some(ref key) = services.anthropic_api_key {
        let mut provider = AnthropicProvider::new(key.clone()).with_timeout(timeout);
        if let Some(ref url) = services.anthropic_base_url {
            provider = provider.with_base_url(url.clone());
        }
        router.add_provider(Arc::new(provider));
    }
    router
}

/// Tell the user how to supply a key when the model's provider has none.
pub fn missing_key_hint(config: &WebAiConfig) -> Option<String> {
    let model = &config.agent.model;
    let services = &config.services;
    if model.starts_with("anthropic/") && services.anthropic_api_key.is_none() {
        return Some(
            "Add to [services] in webai.toml:  anthropic_api_key = \"sk-ant-...\"\n   \
             Or set env var: export ANTHROPIC_API_KEY=sk-ant-..."
                .into(),
        );
    }
    if model.starts_with("openai/") && services.openai_api_key.is_none() {
        return Some(
            "Add to [services] in webai.toml:  openai_api_key = \"sk-...\"\n   \
             Or set env var: export OPENAI_API_KEY=sk-..."
                .into(),
        );
    }
    if services.openai_api_key.is_none() && services.anthropic_api_key.is_none() {
        return Some(
            "Add API keys to [services] in webai.toml or set OPENAI_API_KEY / ANTHROPIC_API_KEY."
                .into(),
        );
    }
    None
}
