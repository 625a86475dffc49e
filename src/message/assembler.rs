use std::sync::Arc;

use serde_json::json;

use crate::memory::{
    model::{Message, MessagePart, Role},
    MemoryAdapter, Model, SortBy, WhereClause,
};

use super::model::{ModelContentPart, ModelMessage};

#[derive(Debug, thiserror::Error)]
pub enum AssemblerError {
    #[error(transparent)]
    Memory(#[from] crate::memory::MemoryError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AssemblerError>;

/// Converts between persisted thread history and the provider-agnostic
/// model-message shape an [`crate::ai::provider::LLMProvider`] consumes.
pub struct MessageAssembler {
    memory: Arc<dyn MemoryAdapter>,
}

impl MessageAssembler {
    pub fn new(memory: Arc<dyn MemoryAdapter>) -> Self {
        Self { memory }
    }

    /// All messages for `thread_id`, ordered by `created_at` ascending.
    pub async fn load_thread(&self, thread_id: &str) -> Result<Vec<Message>> {
        let rows = self
            .memory
            .find_many(
                Model::Message,
                &[WhereClause::eq("threadId", json!(thread_id))],
                Some(SortBy { field: "createdAt".to_string(), descending: false }),
                None,
                None,
            )
            .await?;
        rows.into_iter().map(|v| serde_json::from_value(v).map_err(Into::into)).collect()
    }

    /// Existing history concatenated with `incoming`, unless `incoming`'s id
    /// equals the last stored message's id — an idempotent resend, in which
    /// case the history is returned unchanged.
    pub async fn get_complete_messages(&self, thread_id: &str, incoming: Message) -> Result<Vec<Message>> {
        let mut history = self.load_thread(thread_id).await?;
        if history.last().map(|m| m.id == incoming.id).unwrap_or(false) {
            return Ok(history);
        }
        history.push(incoming);
        Ok(history)
    }

    /// Atomic insert-or-replace keyed by `id`.
    pub async fn upsert_message(&self, message: &Message) -> Result<()> {
        let value = serde_json::to_value(message)?;
        self.memory
            .upsert(Model::Message, &[WhereClause::eq("id", json!(message.id))], value.clone(), value)
            .await?;
        Ok(())
    }

    /// Projects UI messages to model messages. Transient `Data` parts are
    /// dropped. `Reasoning` parts are kept only when the target provider
    /// supports them.
    pub fn convert_to_model_messages(messages: &[Message], supports_reasoning: bool) -> Vec<ModelMessage> {
        messages
            .iter()
            .map(|message| {
                let content = message
                    .parts
                    .iter()
                    .filter(|part| !part.is_transient())
                    .filter_map(|part| match part {
                        MessagePart::Text { text } => Some(ModelContentPart::Text { text: text.clone() }),
                        MessagePart::Reasoning { text } if supports_reasoning => {
                            Some(ModelContentPart::Reasoning { text: text.clone() })
                        }
                        MessagePart::Reasoning { .. } => None,
                        MessagePart::ToolCall { id, name, input } => Some(ModelContentPart::ToolCall {
                            id: id.clone(),
                            name: name.clone(),
                            input: input.clone(),
                        }),
                        MessagePart::ToolResult { id, output } => {
                            Some(ModelContentPart::ToolResult { id: id.clone(), output: output.clone() })
                        }
                        MessagePart::Data { .. } => None,
                    })
                    .collect();
                ModelMessage::new(role_of(message.role), content)
            })
            .collect()
    }

    /// Replaces empty-string text content with a single space, satisfying
    /// providers that reject empty message content.
    pub fn fix_empty_model_messages(messages: &mut [ModelMessage]) {
        for message in messages.iter_mut() {
            if message.content.is_empty() {
                message.content.push(ModelContentPart::Text { text: " ".to_string() });
                continue;
            }
            for part in message.content.iter_mut() {
                if let ModelContentPart::Text { text } = part {
                    if text.is_empty() {
                        *text = " ".to_string();
                    }
                }
            }
        }
    }

    /// Marks the last system, last tool, and last assistant/user message
    /// with an ephemeral cache-control hint, for providers that charge less
    /// to re-read a cached prompt prefix.
    pub fn add_provider_options_to_messages(messages: &mut [ModelMessage], supports_cache_control: bool) {
        if !supports_cache_control {
            return;
        }
        mark_last(messages, |r| matches!(r, Role::System));
        mark_last(messages, |r| matches!(r, Role::Tool));
        mark_last(messages, |r| matches!(r, Role::Assistant | Role::User));
    }
}

fn role_of(role: Role) -> Role {
    role
}

fn mark_last(messages: &mut [ModelMessage], matches: impl Fn(Role) -> bool) {
    if let Some(last) = messages.iter_mut().rev().find(|m| matches(m.role)) {
        last.cache_control = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryAdapter;
    use chrono::Utc;

    fn text_message(id: &str, role: Role, text: &str) -> Message {
        Message {
            id: id.to_string(),
            thread_id: "t1".to_string(),
            role,
            parts: vec![MessagePart::Text { text: text.to_string() }],
            attachments: vec![],
            metadata: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn resend_with_same_id_is_idempotent() {
        let memory: Arc<dyn MemoryAdapter> = Arc::new(InMemoryAdapter::default());
        let assembler = MessageAssembler::new(memory);
        let msg = text_message("m1", Role::User, "hi");
        assembler.upsert_message(&msg).await.unwrap();

        let result = assembler.get_complete_messages("t1", msg.clone()).await.unwrap();
        assert_eq!(result.len(), 1);
    }

    #[tokio::test]
    async fn new_message_is_appended() {
        let memory: Arc<dyn MemoryAdapter> = Arc::new(InMemoryAdapter::default());
        let assembler = MessageAssembler::new(memory);
        let first = text_message("m1", Role::User, "hi");
        assembler.upsert_message(&first).await.unwrap();

        let second = text_message("m2", Role::User, "again");
        let result = assembler.get_complete_messages("t1", second).await.unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn transient_data_parts_are_dropped() {
        let mut msg = text_message("m1", Role::Assistant, "hello");
        msg.parts.push(MessagePart::Data { tag: "agentstart-title_update".to_string(), payload: json!({}), transient: true });
        let converted = MessageAssembler::convert_to_model_messages(&[msg], true);
        assert_eq!(converted[0].content.len(), 1);
    }

    #[test]
    fn reasoning_parts_dropped_when_unsupported() {
        let mut msg = text_message("m1", Role::Assistant, "hello");
        msg.parts.push(MessagePart::Reasoning { text: "thinking...".to_string() });
        let converted = MessageAssembler::convert_to_model_messages(&[msg], false);
        assert_eq!(converted[0].content.len(), 1);
    }

    #[test]
    fn empty_content_becomes_single_space() {
        let mut messages = vec![ModelMessage::new(Role::User, vec![])];
        MessageAssembler::fix_empty_model_messages(&mut messages);
        assert_eq!(messages[0].as_scalar_text(), Some(" "));
    }

    #[test]
    fn cache_control_marks_last_matching_role() {
        let mut messages = vec![
            ModelMessage::new(Role::System, vec![ModelContentPart::Text { text: "sys".to_string() }]),
            ModelMessage::new(Role::User, vec![ModelContentPart::Text { text: "u1".to_string() }]),
            ModelMessage::new(Role::Assistant, vec![ModelContentPart::Text { text: "a1".to_string() }]),
        ];
        MessageAssembler::add_provider_options_to_messages(&mut messages, true);
        assert!(messages[0].cache_control);
        assert!(messages[2].cache_control);
        assert!(!messages[1].cache_control);
    }
}
