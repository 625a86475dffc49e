//! The host-supplied model boundary: a provider-agnostic [`LLMProvider`]
//! trait plus one reference OpenAI-compatible implementation.

pub mod provider;
pub mod providers;
pub mod types;

pub use provider::{AgentStreamResponse, LLMProvider, StreamResponse};
pub use providers::{OpenAICompatibleConfig, OpenAICompatibleProvider};
pub use types::{
    AgentCompletionRequest, AgentStreamEvent, CompletionRequest, CompletionResponse, Message,
    MessageRole, StopReason, StreamChunk, TokenUsage, ToolCall, ToolSpec,
};
