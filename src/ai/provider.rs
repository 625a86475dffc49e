use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Result type for AI operations
pub type Result<T> = std::result::Result<T, String>;

use super::types::{
    AgentCompletionRequest, AgentStreamEvent, CompletionRequest, CompletionResponse, StreamChunk,
};

/// Type alias for a tool-free streaming response
pub type StreamResponse = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// Type alias for an agent-loop model turn's event stream
pub type AgentStreamResponse = Pin<Box<dyn Stream<Item = Result<AgentStreamEvent>> + Send>>;

/// The host-supplied model boundary. One implementation talks to one
/// provider's wire protocol; everything above this trait is provider-agnostic.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Complete a prompt and return the full response. Used by the title and
    /// suggestion generators, which need a single scalar string back.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Stream a tool-free completion response.
    async fn stream(&self, request: CompletionRequest) -> Result<StreamResponse>;

    /// Stream one agent-loop model turn: text/reasoning deltas interleaved
    /// with tool-call argument deltas, terminated by a `Done` event carrying
    /// the stop reason.
    async fn stream_agentic(&self, request: AgentCompletionRequest) -> Result<AgentStreamResponse>;

    /// Get the context window limit for this provider
    fn context_limit(&self) -> usize;

    /// Check if this provider supports function/tool calling
    fn supports_tools(&self) -> bool;

    /// Whether this provider exposes a separate reasoning/thinking channel
    /// the Message Assembler should keep `reasoning` parts for.
    fn supports_reasoning(&self) -> bool {
        false
    }

    /// Whether this provider honors a cache-control hint on message content,
    /// letting the Message Assembler mark cache breakpoints.
    fn supports_cache_control(&self) -> bool {
        false
    }

    /// Get the provider name
    fn provider_name(&self) -> &str;

    /// Pre-establish connection to provider. Default no-op; providers may override.
    async fn warmup(&self) -> Result<()> {
        Ok(())
    }
}

