//! LLM collaborator boundary: client trait, Anthropic implementation,
//! chat types, and the scripted mock used by tests.

pub mod anthropic;
pub mod client;
pub mod types;

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use client::{LlmClient, MockLlmClient, MockReply};
pub use types::{CompletionRequest, CompletionResponse, Message, Role, Usage, extract_json};
