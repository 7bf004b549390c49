//! # webai-cli
//!
//! Command-line interface for the WebAI browsing agent.
//!
//! ## Commands
//!
//! - `webai run` — Answer a question by browsing
//! - `webai browse` — Open a page, label its links and save a screenshot
//! - `webai screen` — Save a full-page screenshot
//! - `webai config` — Show the effective configuration
//! - `webai doctor` — Check configuration, browser and API keys
//! - `webai init` — Write a starter webai.toml

pub mod commands;
pub mod logging;
pub mod providers;

pub use commands::Cli;
