//! Shopping assistant backed by an `OpenAI`-compatible chat-completions API.
//!
//! Stateless: each question is sent on its own with a fixed system prompt
//! describing the marketplace. No conversation history is stored.

pub mod client;
pub mod error;
pub mod types;

pub use client::{AssistantClient, SYSTEM_PROMPT};
pub use error::AssistantError;
