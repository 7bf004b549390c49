#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use webai_config::ConfigLoader;
    use webai_config::schema::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    // ── Default tests ──────────────────────────────────────────

    #[test]
    fn test_agent_config_defaults() {
        let config = WebAiConfig::default();
        assert_eq!(config.agent.model, "openai/gpt-4o");
        assert_eq!(config.agent.max_tokens, 1024);
        assert_eq!(config.agent.max_steps, 20);
        assert!(config.agent.start_url.is_none());
    }

    #[test]
    fn test_browser_config_defaults() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert_eq!(config.viewport_width, 1200);
        assert_eq!(config.viewport_height, 1200);
        assert_eq!(config.device_scale_factor, 1.0);
        assert_eq!(config.settle_timeout_ms, 4000);
        assert_eq!(config.images_dir, PathBuf::from("images"));
    }

    #[test]
    fn test_logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, "pretty");
        assert_eq!(config.file, Some(PathBuf::from("webai.log")));
    }

    // ── TOML tests ─────────────────────────────────────────────

    #[test]
    fn test_partial_toml_applies_defaults() {
        let toml_str = r#"
[agent]
model = "anthropic/claude-sonnet-4-20250514"

[browser]
headless = false
settle_timeout_ms = 1500
"#;
        let config: WebAiConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.agent.model, "anthropic/claude-sonnet-4-20250514");
        assert!(!config.browser.headless);
        assert_eq!(config.browser.settle_timeout_ms, 1500);
        assert_eq!(config.agent.max_tokens, 1024);
        assert_eq!(config.browser.viewport_width, 1200);
    }

    #[test]
    fn test_starter_toml_parses_and_validates() {
        let config =
            ConfigLoader::parse(ConfigLoader::starter_toml(), Path::new("webai.toml")).unwrap();
        assert_eq!(config.agent.model, "openai/gpt-4o");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = ConfigLoader::parse("[agent\nmodel=", Path::new("broken.toml")).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[agent]\nmax_steps = 3\n").unwrap();
        let loader = ConfigLoader::load(Some(file.path())).unwrap();
        assert_eq!(loader.get().agent.max_steps, 3);
        assert_eq!(loader.path(), file.path());
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(ConfigLoader::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[agent]\nmax_steps = 0\n").unwrap();
        let err = ConfigLoader::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("max_steps"));
    }

    // ── Env override tests ─────────────────────────────────────

    #[test]
    fn test_env_overrides_agent_and_browser() {
        let config = ConfigLoader::apply_overrides_from(
            WebAiConfig::default(),
            env(&[
                ("WEBAI_MODEL", "anthropic/claude-haiku-3-5"),
                ("WEBAI_HEADLESS", "false"),
                ("WEBAI_START_URL", "https://example.com"),
                ("CHROME_PATH", "/opt/chrome"),
            ]),
        );
        assert_eq!(config.agent.model, "anthropic/claude-haiku-3-5");
        assert!(!config.browser.headless);
        assert_eq!(config.agent.start_url.as_deref(), Some("https://example.com"));
        assert_eq!(config.browser.executable, Some(PathBuf::from("/opt/chrome")));
    }

    #[test]
    fn test_env_api_key_does_not_override_file() {
        let mut config = WebAiConfig::default();
        config.services.openai_api_key = Some("from-file".into());
        let config = ConfigLoader::apply_overrides_from(
            config,
            env(&[("OPENAI_API_KEY", "from-env"), ("ANTHROPIC_API_KEY", "ant")]),
        );
        assert_eq!(config.services.openai_api_key.as_deref(), Some("from-file"));
        assert_eq!(config.services.anthropic_api_key.as_deref(), Some("ant"));
    }

    #[test]
    fn test_env_bad_headless_value_is_ignored() {
        let config = ConfigLoader::apply_overrides_from(
            WebAiConfig::default(),
            env(&[("WEBAI_HEADLESS", "maybe")]),
        );
        assert!(config.browser.headless);
    }

    // ── Validation tests ───────────────────────────────────────

    #[test]
    fn test_default_config_is_valid() {
        let warnings = WebAiConfig::default().validate().unwrap();
        assert!(warnings.iter().all(|w| w.severity != WarningSeverity::Error));
    }

    #[test]
    fn test_validate_zero_viewport_is_error() {
        let mut config = WebAiConfig::default();
        config.browser.viewport_height = 0;
        let err = config.validate().unwrap_err();
        assert!(err.contains("browser.viewport"));
    }

    #[test]
    fn test_validate_model_without_provider_warns() {
        let mut config = WebAiConfig::default();
        config.agent.model = "gpt-4o".into();
        let warnings = config.validate().unwrap();
        assert!(warnings.iter().any(|w| w.field == "agent.model"));
    }

    #[test]
    fn test_validate_temperature_out_of_range() {
        let mut config = WebAiConfig::default();
        config.agent.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_anthropic_temperature_above_one_warns() {
        let mut config = WebAiConfig::default();
        config.agent.model = "anthropic/claude-sonnet-4-20250514".into();
        config.agent.temperature = 1.5;
        let warnings = config.validate().unwrap();
        let w = warnings
            .iter()
            .find(|w| w.field == "agent.temperature")
            .expect("temperature warning");
        assert_eq!(w.severity, WarningSeverity::Warning);

        config.agent.model = "openai/gpt-4o".into();
        let warnings = config.validate().unwrap();
        assert!(!warnings.iter().any(|w| w.field == "agent.temperature"));

        config.agent.fallback_model = Some("anthropic/claude-3-5-haiku-latest".into());
        let warnings = config.validate().unwrap();
        assert!(warnings.iter().any(|w| w.field == "agent.temperature"));
    }

    // ── Redaction tests ────────────────────────────────────────

    #[test]
    fn test_redacted_masks_api_keys() {
        let mut config = WebAiConfig::default();
        config.services.openai_api_key = Some("sk-proj-abcdef123456".into());
        config.services.anthropic_api_key = Some("short".into());
        config.services.openai_base_url = Some("https://llm.internal/v1".into());

        let redacted = config.redacted();
        assert_eq!(redacted.services.openai_api_key.as_deref(), Some("sk-pro…"));
        assert_eq!(redacted.services.anthropic_api_key.as_deref(), Some("*****"));
        assert_eq!(
            redacted.services.openai_base_url.as_deref(),
            Some("https://llm.internal/v1")
        );
        // The original is untouched.
        assert_eq!(
            config.services.openai_api_key.as_deref(),
            Some("sk-proj-abcdef123456")
        );

        let shown = toml::to_string_pretty(&redacted).unwrap();
        assert!(!shown.contains("abcdef123456"));
    }

    #[test]
    fn test_system_prompt_file_wins() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "from file").unwrap();
        let mut agent = AgentConfig::default();
        agent.system_prompt = Some("inline".into());
        agent.system_prompt_file = Some(file.path().to_path_buf());
        assert_eq!(agent.resolve_system_prompt().unwrap().as_deref(), Some("from file"));
    }
}
