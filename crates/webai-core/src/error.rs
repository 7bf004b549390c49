use thiserror::Error;

/// Unified error type for the whole WebAI workspace.
#[derive(Error, Debug)]
pub enum WebAiError {
    // ── Browser errors ─────────────────────────────────────────
    #[error("browser error: {0}")]
    Browser(String),

    #[error("cdp command failed: {method}: {reason}")]
    Cdp { method: String, reason: String },

    #[error("cdp command timed out after {secs}s: {method}")]
    CdpTimeout { method: String, secs: u64 },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("page script threw: {0}")]
    Script(String),

    #[error("no labeled element matches \"{0}\"")]
    ElementNotFound(String),

    // ── LLM errors ─────────────────────────────────────────────
    #[error("llm provider error: {0}")]
    LlmProvider(String),

    #[error("llm rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("model not found: {0}")]
    ModelNotFound(String),

    // ── Agent errors ───────────────────────────────────────────
    #[error("agent stopped after {steps} steps without an answer")]
    StepLimit { steps: u32 },

    #[error("agent error: {0}")]
    Agent(String),

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl WebAiError {
    /// Shorthand for a CDP failure on `method`.
    pub fn cdp(method: &str, reason: impl Into<String>) -> Self {
        Self::Cdp {
            method: method.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WebAiError>;
