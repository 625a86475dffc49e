//! Row types for the three models the memory adapter serves: `thread`,
//! `message`, `todo`. See [`super::Model`] for the closed set of model names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `thread` row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_context: Option<serde_json::Value>,
    /// The sandbox lease this thread last used, if any. The Thread Stream
    /// Coordinator reuses it instead of provisioning a fresh sandbox.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
}

impl Thread {
    pub fn new(id: impl Into<String>, user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            user_id: user_id.into(),
            title: "New Thread".to_string(),
            visibility: Visibility::Private,
            last_context: None,
            sandbox_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// `message` row. `parts` is the ordered tagged-union sequence that makes
/// up a message's content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub role: Role,
    pub parts: Vec<MessagePart>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

/// One element of a message's ordered content.
///
/// `Data` carries the `data-agentstart-*` transient frame family: any
/// variant with `transient = true` must not be persisted — callers filter
/// these out before handing a `Message` to [`super::MemoryAdapter`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessagePart {
    Text { text: String },
    Reasoning { text: String },
    #[serde(rename = "tool-call")]
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(rename = "tool-result")]
    ToolResult {
        id: String,
        output: serde_json::Value,
    },
    Data {
        tag: String,
        payload: serde_json::Value,
        #[serde(default)]
        transient: bool,
    },
}

impl MessagePart {
    pub fn is_transient(&self) -> bool {
        matches!(self, MessagePart::Data { transient: true, .. })
    }
}

/// `todo` row — unique per `thread_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub thread_id: String,
    pub todos: Vec<TodoItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: String,
    pub content: String,
    pub status: TodoStatus,
    #[serde(default)]
    pub priority: Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_data_part_is_flagged() {
        let p = MessagePart::Data {
            tag: "agentstart-title_update".into(),
            payload: serde_json::json!({"title": "x"}),
            transient: true,
        };
        assert!(p.is_transient());
    }

    #[test]
    fn text_part_is_not_transient() {
        let p = MessagePart::Text { text: "hi".into() };
        assert!(!p.is_transient());
    }

    #[test]
    fn new_thread_has_default_title() {
        let t = Thread::new("t1", "u1");
        assert_eq!(t.title, "New Thread");
        assert_eq!(t.visibility, Visibility::Private);
    }
}
