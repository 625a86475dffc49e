use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

/// One event in a tool's status stream. Every `execute` call produces
/// exactly one `Pending` immediately, zero or more further `Pending`
/// updates, and exactly one terminal `Done` or `Error` — the terminal
/// event doubles as the channel-close signal once the sender drops.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolEvent {
    Pending { prompt: String },
    Done { metadata: Option<Value>, prompt: String },
    Error { message: String, prompt: String },
}

impl ToolEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ToolEvent::Pending { .. })
    }
}

/// A capability the agent loop can invoke. `execute` returns the receive
/// end of a bounded channel rather than a single result: callers drain it
/// until the terminal event, same shape as every built-in tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Stable machine identifier, e.g. `"bash"`.
    fn name(&self) -> &str;

    /// Prompt text shown to the model describing what this tool does.
    fn description(&self) -> &str;

    fn input_schema(&self) -> Value;

    fn output_schema(&self) -> Value {
        serde_json::json!({ "type": "object" })
    }

    async fn execute(&self, thread_id: &str, args: Value) -> mpsc::Receiver<ToolEvent>;

    /// Projects the terminal event into the text fed back to the model.
    /// Default: the `prompt` field of whichever terminal event arrives.
    fn to_model_output(&self, event: &ToolEvent) -> String {
        match event {
            ToolEvent::Done { prompt, .. } => prompt.clone(),
            ToolEvent::Error { prompt, .. } => prompt.clone(),
            ToolEvent::Pending { prompt } => prompt.clone(),
        }
    }
}

/// Summary of a registered tool, suitable for inclusion in an LLM request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Spawns a bounded `mpsc::channel` and runs `body` to completion,
/// forwarding a final `Done`/`Error` derived from its `Result`. Built-in
/// tools use this so each only has to produce its terminal payload; the
/// boilerplate pending-then-terminal bookkeeping lives in one place.
pub fn run_tool<F, Fut>(prompt: impl Into<String>, body: F) -> mpsc::Receiver<ToolEvent>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<(String, Option<Value>), String>> + Send,
{
    let (tx, rx) = mpsc::channel(8);
    let prompt = prompt.into();
    tokio::spawn(async move {
        let _ = tx.send(ToolEvent::Pending { prompt: prompt.clone() }).await;
        let event = match body().await {
            Ok((output, metadata)) => ToolEvent::Done { metadata, prompt: output },
            Err(message) => ToolEvent::Error { message, prompt },
        };
        let _ = tx.send(event).await;
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_tool_emits_pending_then_done() {
        let mut rx = run_tool("starting", || async { Ok(("finished".to_string(), None)) });
        let first = rx.recv().await.unwrap();
        assert!(matches!(first, ToolEvent::Pending { .. }));
        let second = rx.recv().await.unwrap();
        assert!(matches!(second, ToolEvent::Done { .. }));
        assert!(second.is_terminal());
    }

    #[tokio::test]
    async fn run_tool_emits_error_on_failure() {
        let mut rx = run_tool("starting", || async { Err("boom".to_string()) });
        let _ = rx.recv().await.unwrap();
        let terminal = rx.recv().await.unwrap();
        assert!(matches!(terminal, ToolEvent::Error { .. }));
    }
}
