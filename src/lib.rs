pub mod agent;
pub mod ai;
pub mod config;
pub mod gateway;
pub mod kv;
pub mod memory;
pub mod message;
pub mod modules;
pub mod sandbox;
pub mod security;
pub mod thread;
pub mod tools;

/// Convenience re-exports for the most commonly used traits and types across
/// the runtime.
///
/// ```rust
/// use agentstart_runtime::prelude::*;
/// ```
pub mod prelude {
    pub use crate::ai::provider::LLMProvider;
    pub use crate::ai::types::{CompletionRequest, CompletionResponse, Message, MessageRole};

    pub use crate::tools::{Tool, ToolEvent, ToolRegistry};

    pub use crate::memory::{MemoryAdapter, MemoryError};
    pub use crate::memory::model::{Thread, Message as StoredMessage, MessagePart, Todo, TodoItem, TodoStatus};

    pub use crate::security::{AutonomyLevel, SecurityPolicy, ValidationResult};

    pub use crate::config::{AppConfig, load_default_config};

    pub use crate::sandbox::{SandboxAdapter, LeaseManager};

    pub use crate::agent::{AgentLoop, AgentLoopConfig};

    pub use crate::thread::ThreadCoordinator;
}
