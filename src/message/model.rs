use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::memory::model::Role;

/// One element of a model message's content — the provider-agnostic
/// projection of [`crate::memory::model::MessagePart`]. `Data` parts never
/// reach this layer; they are dropped during conversion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ModelContentPart {
    Text { text: String },
    Reasoning { text: String },
    #[serde(rename = "tool-call")]
    ToolCall { id: String, name: String, input: Value },
    #[serde(rename = "tool-result")]
    ToolResult { id: String, output: Value },
}

/// A message ready to hand to an [`crate::ai::provider::LLMProvider`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelMessage {
    pub role: Role,
    pub content: Vec<ModelContentPart>,
    /// Ephemeral cache-control hint, set by `add_provider_options` on the
    /// last system, last tool, and last assistant/user message when the
    /// target provider supports prompt caching.
    #[serde(default)]
    pub cache_control: bool,
}

impl ModelMessage {
    pub fn new(role: Role, content: Vec<ModelContentPart>) -> Self {
        Self { role, content, cache_control: false }
    }

    /// `Some(text)` when this message's content is exactly one text part —
    /// the case a provider expects to receive as a scalar string rather
    /// than a content-part array.
    pub fn as_scalar_text(&self) -> Option<&str> {
        match self.content.as_slice() {
            [ModelContentPart::Text { text }] => Some(text.as_str()),
            _ => None,
        }
    }
}
