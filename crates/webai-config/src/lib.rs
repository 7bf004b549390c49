//! # webai-config
//!
//! Configuration for the WebAI agent. Reads `webai.toml`, then applies
//! environment variable overrides.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::WebAiConfig;
pub use schema::{
    AgentConfig, BrowserConfig, ConfigWarning, LoggingConfig, ServicesConfig, WarningSeverity,
};
