use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::schema::WebAiConfig;

/// Loads the WebAI configuration.
#[derive(Debug)]
pub struct ConfigLoader {
    config: WebAiConfig,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > WEBAI_CONFIG env > ./webai.toml > ~/.webai/webai.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("WEBAI_CONFIG") {
            return PathBuf::from(p);
        }
        let local = PathBuf::from("webai.toml");
        if local.exists() {
            return local;
        }
        Self::home_path()
    }

    /// `~/.webai/webai.toml`
    pub fn home_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".webai")
            .join("webai.toml")
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load(path: Option<&Path>) -> webai_core::Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            let raw = std::fs::read_to_string(&config_path)?;
            Self::parse(&raw, &config_path)?
        } else {
            // An explicitly requested file that is missing is a mistake, not a default.
            if path.is_some() {
                return Err(webai_core::WebAiError::Config(format!(
                    "config file not found: {}",
                    config_path.display()
                )));
            }
            info!(?config_path, "config file not found, using defaults");
            WebAiConfig::default()
        };

        let config = Self::apply_env_overrides(config);

        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
            }
            Err(e) => {
                return Err(webai_core::WebAiError::Config(e));
            }
        }

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Parse TOML text into a config, attributing errors to `origin`.
    pub fn parse(raw: &str, origin: &Path) -> webai_core::Result<WebAiConfig> {
        toml::from_str::<WebAiConfig>(raw).map_err(|e| {
            webai_core::WebAiError::Config(format!("failed to parse {}: {}", origin.display(), e))
        })
    }

    /// Get a copy of the loaded config.
    pub fn get(&self) -> WebAiConfig {
        self.config.clone()
    }

    /// Path the config was (or would have been) loaded from.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(config: WebAiConfig) -> WebAiConfig {
        Self::apply_overrides_from(config, |key| std::env::var(key).ok())
    }

    /// Apply overrides using `lookup` as the variable source.
    ///
    /// WEBAI_* variables always win. API keys and CHROME_PATH only fill
    /// values the file left unset.
    pub fn apply_overrides_from<F>(mut config: WebAiConfig, lookup: F) -> WebAiConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("WEBAI_MODEL") {
            config.agent.model = v;
        }
        if let Some(v) = lookup("WEBAI_START_URL") {
            config.agent.start_url = Some(v);
        }
        if let Some(v) = lookup("WEBAI_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Some(v) = lookup("WEBAI_HEADLESS") {
            match v.to_lowercase().as_str() {
                "1" | "true" | "yes" => config.browser.headless = true,
                "0" | "false" | "no" => config.browser.headless = false,
                other => warn!(value = other, "ignoring unrecognised WEBAI_HEADLESS"),
            }
        }
        if config.browser.executable.is_none()
            && let Some(v) = lookup("CHROME_PATH")
        {
            config.browser.executable = Some(PathBuf::from(v));
        }
        if config.services.openai_api_key.is_none()
            && let Some(v) = lookup("OPENAI_API_KEY")
        {
            config.services.openai_api_key = Some(v);
        }
        if config.services.anthropic_api_key.is_none()
            && let Some(v) = lookup("ANTHROPIC_API_KEY")
        {
            config.services.anthropic_api_key = Some(v);
        }
        config
    }

    /// Commented starter config written by `webai init`.
    pub fn starter_toml() -> &'static str {
        r#"# WebAI agent configuration

[agent]
model = "openai/gpt-4o"
# fallback_model = "anthropic/claude-sonnet-4-20250514"
# max_tokens = 1024
# max_steps = 20
# start_url = "https://docs.phantom.app"

[browser]
headless = true
# executable = "/usr/bin/chromium"   # or env: CHROME_PATH
# port = 9222
# viewport_width = 1200
# viewport_height = 1200
# settle_timeout_ms = 4000
# images_dir = "images"

[services]
# openai_api_key = "sk-..."          # or env: OPENAI_API_KEY
# anthropic_api_key = "sk-ant-..."   # or env: ANTHROPIC_API_KEY

[logging]
level = "info"
# format = "pretty"
file = "webai.log"
"#
    }
}
