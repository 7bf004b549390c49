//! # webai-agent
//!
//! The browse loop: show the model a labeled screenshot, follow its
//! `{"url": ...}` / `{"click": ...}` directives, stop at a plain answer.

pub mod agent;
pub mod directive;
pub mod driver;
pub mod prompt;

pub use agent::{Agent, AgentOutcome, AgentSettings, StepEvent};
pub use directive::Directive;
pub use driver::{BrowserDriver, PageDriver};
