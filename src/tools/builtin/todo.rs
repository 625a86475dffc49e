use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::memory::{
    generate_id,
    model::{Todo, TodoItem, TodoStatus},
    MemoryAdapter, Model, WhereClause,
};

use super::super::traits::{Tool, ToolEvent, run_tool};

pub struct TodoReadTool {
    memory: Arc<dyn MemoryAdapter>,
}

impl TodoReadTool {
    pub fn new(memory: Arc<dyn MemoryAdapter>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for TodoReadTool {
    fn name(&self) -> &str {
        "todoRead"
    }

    fn description(&self) -> &str {
        "Return the thread's current todo list."
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, thread_id: &str, _args: Value) -> mpsc::Receiver<ToolEvent> {
        let memory = self.memory.clone();
        let thread_id = thread_id.to_string();

        run_tool("Reading todos", move || async move {
            let row = memory
                .find_one(Model::Todo, &[WhereClause::eq("threadId", json!(thread_id))])
                .await
                .map_err(|e| e.to_string())?;
            match row {
                Some(value) => {
                    let todo: Todo = serde_json::from_value(value).map_err(|e| e.to_string())?;
                    Ok((serde_json::to_string(&todo.todos).unwrap_or_default(), Some(json!({ "todos": todo.todos }))))
                }
                None => Err("no todos exist for this thread".to_string()),
            }
        })
    }
}

pub struct TodoWriteTool {
    memory: Arc<dyn MemoryAdapter>,
}

impl TodoWriteTool {
    pub fn new(memory: Arc<dyn MemoryAdapter>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for TodoWriteTool {
    fn name(&self) -> &str {
        "todoWrite"
    }

    fn description(&self) -> &str {
        "Replace the thread's todo list. At most one item may be inProgress."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "todos": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "content": { "type": "string" },
                            "status": { "type": "string", "enum": ["pending", "in_progress", "completed"] },
                            "priority": { "type": "string", "enum": ["low", "medium", "high"] }
                        },
                        "required": ["content", "status"]
                    }
                }
            },
            "required": ["todos"]
        })
    }

    async fn execute(&self, thread_id: &str, args: Value) -> mpsc::Receiver<ToolEvent> {
        let memory = self.memory.clone();
        let thread_id = thread_id.to_string();
        let raw_todos = args.get("todos").cloned().unwrap_or(json!([]));

        run_tool("Writing todos", move || async move {
            let mut todos: Vec<TodoItem> = serde_json::from_value(raw_todos).map_err(|e| format!("invalid todos: {e}"))?;
            for item in todos.iter_mut() {
                if item.id.is_empty() {
                    item.id = generate_id();
                }
            }

            let in_progress = todos.iter().filter(|t| t.status == TodoStatus::InProgress).count();
            if in_progress > 1 {
                return Err("Only one task can be inProgress at a time".to_string());
            }

            let row = Todo { thread_id: thread_id.clone(), todos: todos.clone() };
            memory
                .upsert(
                    Model::Todo,
                    &[WhereClause::eq("threadId", json!(thread_id))],
                    serde_json::to_value(&row).map_err(|e| e.to_string())?,
                    serde_json::to_value(&row).map_err(|e| e.to_string())?,
                )
                .await
                .map_err(|e| e.to_string())?;

            Ok((format!("Saved {} todos", todos.len()), Some(json!({ "todos": todos }))))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryAdapter;

    #[tokio::test]
    async fn second_in_progress_item_is_rejected() {
        let memory: Arc<dyn MemoryAdapter> = Arc::new(InMemoryAdapter::default());
        let tool = TodoWriteTool::new(memory);
        let mut rx = tool
            .execute(
                "t1",
                json!({ "todos": [
                    { "content": "a", "status": "in_progress" },
                    { "content": "b", "status": "in_progress" }
                ] }),
            )
            .await;
        let mut saw_error = false;
        while let Some(event) = rx.recv().await {
            if let ToolEvent::Error { message, .. } = &event {
                assert!(message.contains("Only one task can be inProgress"));
                saw_error = true;
            }
        }
        assert!(saw_error);
    }

    #[tokio::test]
    async fn read_before_any_write_errors() {
        let memory: Arc<dyn MemoryAdapter> = Arc::new(InMemoryAdapter::default());
        let tool = TodoReadTool::new(memory);
        let mut rx = tool.execute("t1", json!({})).await;
        let mut saw_error = false;
        while let Some(event) = rx.recv().await {
            if matches!(event, ToolEvent::Error { .. }) {
                saw_error = true;
            }
        }
        assert!(saw_error);
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let memory: Arc<dyn MemoryAdapter> = Arc::new(InMemoryAdapter::default());
        let write = TodoWriteTool::new(memory.clone());
        let mut rx = write
            .execute("t1", json!({ "todos": [{ "content": "a", "status": "pending" }] }))
            .await;
        while rx.recv().await.is_some() {}

        let read = TodoReadTool::new(memory);
        let mut rx = read.execute("t1", json!({})).await;
        let mut done = false;
        while let Some(event) = rx.recv().await {
            if matches!(event, ToolEvent::Done { .. }) {
                done = true;
            }
        }
        assert!(done);
    }
}
