use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration — maps to `webai.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebAiConfig {
    pub agent: AgentConfig,
    pub browser: BrowserConfig,
    pub services: ServicesConfig,
    pub logging: LoggingConfig,
}

// ── Agent ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Vision model identifier, e.g. "openai/gpt-4o".
    pub model: String,
    /// Model to try when the primary one keeps failing.
    pub fallback_model: Option<String>,
    /// Replaces the built-in browsing instructions.
    pub system_prompt: Option<String>,
    /// Path to a file containing the system prompt (overrides `system_prompt`).
    pub system_prompt_file: Option<PathBuf>,
    /// Maximum tokens per model reply.
    pub max_tokens: u32,
    /// Temperature (0.0 - 2.0).
    pub temperature: f32,
    /// Maximum model turns before the loop gives up.
    pub max_steps: u32,
    /// Page to open before the first model turn.
    pub start_url: Option<String>,
    /// HTTP timeout for a single model request.
    pub request_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "openai/gpt-4o".into(),
            fallback_model: None,
            system_prompt: None,
            system_prompt_file: None,
            max_tokens: 1024,
            temperature: 0.7,
            max_steps: 20,
            start_url: None,
            request_timeout_secs: 120,
        }
    }
}

impl AgentConfig {
    /// Resolve the configured system prompt, reading `system_prompt_file` if set.
    pub fn resolve_system_prompt(&self) -> webai_core::Result<Option<String>> {
        if let Some(ref path) = self.system_prompt_file {
            let text = std::fs::read_to_string(path).map_err(|e| {
                webai_core::WebAiError::Config(format!(
                    "cannot read system_prompt_file {}: {e}",
                    path.display()
                ))
            })?;
            return Ok(Some(text));
        }
        Ok(self.system_prompt.clone())
    }
}

// ── Browser ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Chrome/Chromium executable. Auto-detected when unset.
    pub executable: Option<PathBuf>,
    /// Run without a visible window.
    pub headless: bool,
    /// Remote debugging port.
    pub port: u16,
    /// Attach to a browser already listening on `port` instead of launching one.
    pub reuse_existing: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub device_scale_factor: f64,
    /// How long to wait for the `load` event after navigating or clicking.
    pub settle_timeout_ms: u64,
    /// Upper bound for DOMContentLoaded after `Page.navigate`.
    pub navigation_timeout_secs: u64,
    /// How long to wait for a launched browser to accept connections.
    pub launch_timeout_secs: u64,
    /// Per-command CDP timeout.
    pub command_timeout_secs: u64,
    /// Where screenshots are written.
    pub images_dir: PathBuf,
    /// Extra command-line flags passed to the browser.
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            port: 9222,
            reuse_existing: false,
            viewport_width: 1200,
            viewport_height: 1200,
            device_scale_factor: 1.0,
            settle_timeout_ms: 4000,
            navigation_timeout_secs: 30,
            launch_timeout_secs: 10,
            command_timeout_secs: 30,
            images_dir: PathBuf::from("images"),
            extra_args: vec![],
        }
    }
}

// ── Services ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub openai_api_key: Option<String>,
    /// OpenAI-compatible endpoint (Azure, vLLM, ...).
    pub openai_base_url: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: Option<String>,
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Console format: "pretty", "json", "compact".
    pub format: String,
    /// Log file path (None = console only).
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
            file: Some(PathBuf::from("webai.log")),
        }
    }
}

// ── Validation ─────────────────────────────────────────────────

/// One finding from [`WebAiConfig::validate`].
#[derive(Debug)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Error,
    Warning,
    Info,
}

impl ConfigWarning {
    fn new(severity: WarningSeverity, field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
            severity,
            hint: None,
        }
    }

    fn error(field: &str, message: impl Into<String>) -> Self {
        Self::new(WarningSeverity::Error, field, message)
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self::new(WarningSeverity::Warning, field, message)
    }

    fn info(field: &str, message: impl Into<String>) -> Self {
        Self::new(WarningSeverity::Info, field, message)
    }

    fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let icon = match self.severity {
            WarningSeverity::Error => "❌",
            WarningSeverity::Warning => "⚠️ ",
            WarningSeverity::Info => "💡",
        };
        write!(f, "{icon} {}: {}", self.field, self.message)?;
        if let Some(ref hint) = self.hint {
            write!(f, "\n   ↳ {hint}")?;
        }
        Ok(())
    }
}

const LOG_FORMATS: [&str; 3] = ["pretty", "json", "compact"];
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl WebAiConfig {
    /// Copy with API keys cut to their first few characters, for display.
    pub fn redacted(&self) -> WebAiConfig {
        let mut config = self.clone();
        let services = &mut config.services;
        for key in [&mut services.openai_api_key, &mut services.anthropic_api_key] {
            if let Some(k) = key.as_mut() {
                *k = mask_key(k);
            }
        }
        config
    }

    /// Check the config. Errors make the whole config unusable and are
    /// returned joined as `Err`; everything else comes back as findings.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, String> {
        let agent = &self.agent;
        let browser = &self.browser;
        let mut findings = Vec::new();

        if agent.model.is_empty() {
            findings.push(
                ConfigWarning::error("agent.model", "model is empty")
                    .hint("Set to e.g. 'openai/gpt-4o'"),
            );
        } else if !agent.model.contains('/') {
            findings.push(
                ConfigWarning::warning(
                    "agent.model",
                    format!("'{}' has no provider prefix", agent.model),
                )
                .hint("Use 'openai/gpt-4o' or 'anthropic/claude-sonnet-4-20250514'"),
            );
        }
        if !(0.0..=2.0).contains(&agent.temperature) {
            findings.push(
                ConfigWarning::error(
                    "agent.temperature",
                    format!("{} is outside 0.0..=2.0", agent.temperature),
                ),
            );
        } else if agent.temperature > 1.0
            && std::iter::once(agent.model.as_str())
                .chain(agent.fallback_model.as_deref())
                .any(|m| m.starts_with("anthropic/"))
        {
            findings.push(
                ConfigWarning::warning(
                    "agent.temperature",
                    format!("{} is above Anthropic's maximum", agent.temperature),
                )
                .hint("Anthropic accepts 0.0 to 1.0; requests will be rejected"),
            );
        }
        if agent.max_tokens == 0 {
            findings.push(
                ConfigWarning::error("agent.max_tokens", "the model can't reply with 0 tokens")
                    .hint("Set to e.g. 1024"),
            );
        }
        if agent.max_steps == 0 {
            findings.push(
                ConfigWarning::error("agent.max_steps", "the model would never be asked")
                    .hint("Set to e.g. 20"),
            );
        }
        if let Some(ref url) = agent.start_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            findings.push(
                ConfigWarning::warning("agent.start_url", format!("'{url}' has no http(s) scheme"))
                    .hint("Chrome may treat it as a search or a file path"),
            );
        }

        if browser.viewport_width == 0 || browser.viewport_height == 0 {
            findings.push(
                ConfigWarning::error(
                    "browser.viewport",
                    format!(
                        "{}x{} has a zero dimension",
                        browser.viewport_width, browser.viewport_height
                    ),
                )
                .hint("The default is 1200x1200"),
            );
        }
        if browser.device_scale_factor <= 0.0 {
            findings.push(
                ConfigWarning::error("browser.device_scale_factor", "must be positive")
                    .hint("Use 1.0 unless you need high-DPI screenshots"),
            );
        }
        if browser.settle_timeout_ms == 0 {
            findings.push(
                ConfigWarning::warning(
                    "browser.settle_timeout_ms",
                    "screenshots may show half-loaded pages",
                )
                .hint("The default is 4000"),
            );
        }
        if !browser.headless {
            findings.push(ConfigWarning::info(
                "browser.headless",
                "browser runs with a visible window",
            ));
        }

        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            findings.push(
                ConfigWarning::warning(
                    "logging.format",
                    format!("unknown log format '{}'", self.logging.format),
                )
                .hint(format!("Valid values: {}", LOG_FORMATS.join(", "))),
            );
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            findings.push(
                ConfigWarning::warning(
                    "logging.level",
                    format!("unknown log level '{}'", self.logging.level),
                )
                .hint(format!("Valid values: {}", LOG_LEVELS.join(", "))),
            );
        }

        let errors: Vec<String> = findings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .map(|w| format!("{}: {}", w.field, w.message))
            .collect();
        if errors.is_empty() {
            Ok(findings)
        } else {
            Err(format!("Configuration errors:\n  • {}", errors.join("\n  • ")))
        }
    }
}

fn mask_key(key: &str) -> String {
    let shown: String = key.chars().take(6).collect();
    if shown.len() == key.len() {
        "*".repeat(key.chars().count())
    } else {
        format!("{shown}…")
    }
}
