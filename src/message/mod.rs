//! The Message Assembler: converts between persisted UI-facing messages and
//! the provider-agnostic model-message shape the agent loop hands to an
//! [`crate::ai::provider::LLMProvider`].

pub mod assembler;
pub mod model;

pub use assembler::{AssemblerError, MessageAssembler};
pub use model::{ModelContentPart, ModelMessage};
