//! The UI event stream: the tagged frame family `thread.stream` emits.
//!
//! The agent loop only ever produces the first six variants; `message-start`,
//! the `data-agentstart-*` frames, and `error` outside of a model failure are
//! added by [`crate::thread::coordinator::ThreadCoordinator`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiEvent {
    TextDelta {
        delta: String,
    },
    ReasoningDelta {
        delta: String,
    },
    ToolCall {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        id: String,
        output: Value,
    },
    MessageStart {
        id: String,
    },
    MessageFinish {
        id: String,
    },
    #[serde(rename = "data-agentstart-title_update")]
    TitleUpdate {
        title: String,
    },
    #[serde(rename = "data-agentstart-suggestions")]
    Suggestions {
        prompts: Vec<String>,
    },
    Error {
        message: String,
    },
}
