//! # webai-core
//!
//! Shared vocabulary for the WebAI workspace: the error type and the
//! conversation messages exchanged with vision models.

pub mod error;
pub mod message;

pub use error::{Result, WebAiError};
pub use message::{Message, MessageContent, Role};
