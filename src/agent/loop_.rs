//! `AgentLoop` — the tool-loop scheduler.
//!
//! # Algorithm
//!
//! ```text
//!        ┌────── start ──────┐
//!        │                    ▼
//!        │             callModel(messages)
//!        │                    │
//!        │     ┌──────────────┼──────────────┐
//!        │     │              │              │
//!        │   text/           tool           stop
//!        │  reasoning       calls          reason
//!        │     │              │              │
//!        │   emit           execute         FINAL
//!        │   part            tool
//!        │     │              │
//!        │     │        append result
//!        │     │              │
//!        │     │              ▼
//!        │     └──── stopPredicate? ──── no ──┐
//!        │                    │                │
//!        │                   yes ─── FINAL     │
//!        └────────────────────────────────────┘
//! ```
//!
//! One call to [`AgentLoop::run`] drives this to completion for one user
//! turn, streaming [`UiEvent`]s to the caller's writer and returning the
//! ordered parts of the single assistant message the turn produced.

use std::{collections::HashMap, sync::Arc};

use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::{
    ai::{
        provider::LLMProvider,
        types::{AgentCompletionRequest, AgentStreamEvent, StopReason, ToolCall, ToolSpec},
    },
    memory::model::{MessagePart, Role},
    message::model::{ModelContentPart, ModelMessage},
    security::{SecurityPolicy, ValidationResult},
    tools::{ToolEvent, ToolRegistry},
};

use super::event::UiEvent;

/// Controls whether tool calls within one model step run one at a time or
/// concurrently. Sequential is the default: built-in tools frequently depend
/// on each other's side effects within the same step (a `write` immediately
/// followed by a `bash` that exercises it), and sequential dispatch keeps
/// that ordering unsurprising without requiring the model to serialize calls
/// itself. Set to `Parallel` for tool sets known to be independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolDispatchPolicy {
    Sequential,
    Parallel,
}

/// Evaluated after every completed model step (text or tool-call) with the
/// 1-based step count; `true` ends the loop.
pub type StopPredicate = Arc<dyn Fn(usize) -> bool + Send + Sync>;

/// The default stop predicate: terminate after 100 steps.
pub fn step_count_is(n: usize) -> StopPredicate {
    Arc::new(move |step| step >= n)
}

#[derive(Clone)]
pub struct AgentLoopConfig {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub stop_when: StopPredicate,
    pub tool_dispatch: ToolDispatchPolicy,
}

impl std::fmt::Debug for AgentLoopConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentLoopConfig")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("tool_dispatch", &self.tool_dispatch)
            .finish_non_exhaustive()
    }
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: None,
            max_tokens: None,
            stop_when: step_count_is(100),
            tool_dispatch: ToolDispatchPolicy::Sequential,
        }
    }
}

/// Why [`AgentLoop::run`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The model reached a natural stop, or the step budget was exhausted.
    Final,
    /// A tool call requires external approval before it can run; the loop
    /// has halted without dispatching it. The caller is responsible for
    /// resuming with a fresh `run` once approval is granted or denied.
    NeedsApproval { tool_name: String },
    /// The writer's consumer went away; already-started tool calls (if any)
    /// were allowed to finish, but no further model calls were made.
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum AgentLoopError {
    #[error("model error: {0}")]
    Model(String),
}

/// The tool-loop scheduler: one instance per configured agent; `run` is
/// called once per user turn with that turn's runtime context.
pub struct AgentLoop {
    provider: Arc<dyn LLMProvider>,
    tools: Arc<ToolRegistry>,
    security: Arc<SecurityPolicy>,
    config: AgentLoopConfig,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        tools: Arc<ToolRegistry>,
        security: Arc<SecurityPolicy>,
        config: AgentLoopConfig,
    ) -> Self {
        Self { provider, tools, security, config }
    }

    /// Runs the loop to completion (or cancellation) for one user turn.
    ///
    /// `provider_messages` is the full model-message prefix for this turn
    /// (system + history + the new user message); it is extended in place
    /// as the loop proceeds so the caller can inspect it afterwards, but the
    /// return value is what matters for persistence: the ordered content
    /// parts of the single assistant message this turn produced.
    pub async fn run(
        &self,
        thread_id: &str,
        mut provider_messages: Vec<ModelMessage>,
        writer: mpsc::Sender<UiEvent>,
        mut cancel: oneshot::Receiver<()>,
    ) -> Result<(Vec<MessagePart>, LoopOutcome), AgentLoopError> {
        let mut final_parts: Vec<MessagePart> = Vec::new();
        let mut step = 0usize;

        loop {
            if matches!(cancel.try_recv(), Ok(()) | Err(oneshot::error::TryRecvError::Closed)) {
                return Ok((final_parts, LoopOutcome::Cancelled));
            }

            let step_result = tokio::select! {
                biased;
                _ = &mut cancel => None,
                result = self.run_one_step(&provider_messages, &writer) => Some(result),
            };

            let step_result = match step_result {
                None => return Ok((final_parts, LoopOutcome::Cancelled)),
                Some(Err(e)) => {
                    // Model errors propagate as the final event; whatever was
                    // accumulated so far is still delivered.
                    let _ = writer.send(UiEvent::Error { message: e.to_string() }).await;
                    return Ok((final_parts, LoopOutcome::Final));
                }
                Some(Ok(r)) => r,
            };

            if !step_result.text.is_empty() {
                final_parts.push(MessagePart::Text { text: step_result.text.clone() });
                provider_messages.push(ModelMessage::new(
                    Role::Assistant,
                    vec![ModelContentPart::Text { text: step_result.text }],
                ));
            }

            if step_result.tool_calls.is_empty() {
                return Ok((final_parts, LoopOutcome::Final));
            }

            // Phase 1: announce every tool call before any of them execute,
            // in the exact order the model emitted them.
            for tc in &step_result.tool_calls {
                final_parts.push(MessagePart::ToolCall {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                    input: tc.input.clone(),
                });
                provider_messages.push(ModelMessage::new(
                    Role::Assistant,
                    vec![ModelContentPart::ToolCall {
                        id: tc.id.clone(),
                        name: tc.name.clone(),
                        input: tc.input.clone(),
                    }],
                ));
                let _ = writer
                    .send(UiEvent::ToolCall { id: tc.id.clone(), name: tc.name.clone(), input: tc.input.clone() })
                    .await;
            }

            // A call requiring approval halts the loop entirely; calls
            // ahead of it in emission order still run.
            let mut dispatch_list: Vec<&ToolCall> = Vec::new();
            let mut halt_at: Option<String> = None;
            for tc in &step_result.tool_calls {
                match self.security.validate_command(&tc.name) {
                    ValidationResult::NeedsApproval => {
                        halt_at = Some(tc.name.clone());
                        break;
                    }
                    ValidationResult::Denied(_) | ValidationResult::Allowed => dispatch_list.push(tc),
                }
            }

            // Phase 2: execute, then splice results back in original order
            // regardless of completion order.
            let outputs = self.dispatch(thread_id, &dispatch_list).await;
            for (tc, output) in dispatch_list.iter().zip(outputs.into_iter()) {
                final_parts.push(MessagePart::ToolResult { id: tc.id.clone(), output: output.clone() });
                provider_messages.push(ModelMessage::new(
                    Role::Tool,
                    vec![ModelContentPart::ToolResult { id: tc.id.clone(), output: output.clone() }],
                ));
                let _ = writer.send(UiEvent::ToolResult { id: tc.id.clone(), output }).await;
            }

            if let Some(tool_name) = halt_at {
                return Ok((final_parts, LoopOutcome::NeedsApproval { tool_name }));
            }

            step += 1;
            if (self.config.stop_when)(step) {
                return Ok((final_parts, LoopOutcome::Final));
            }
        }
    }

    async fn dispatch(&self, thread_id: &str, calls: &[&ToolCall]) -> Vec<Value> {
        match self.config.tool_dispatch {
            ToolDispatchPolicy::Sequential => {
                let mut out = Vec::with_capacity(calls.len());
                for tc in calls {
                    out.push(self.execute_tool(thread_id, tc).await);
                }
                out
            }
            ToolDispatchPolicy::Parallel => {
                futures::future::join_all(calls.iter().map(|tc| self.execute_tool(thread_id, tc))).await
            }
        }
    }

    /// Runs the security policy, dispatches to the registry, and drains the
    /// tool's event stream to its terminal event.
    async fn execute_tool(&self, thread_id: &str, tc: &ToolCall) -> Value {
        let risk = self.security.classify_command_risk(&tc.name);

        if let ValidationResult::Denied(reason) = self.security.validate_command(&tc.name) {
            self.security.log_action(&tc.name, tc.input.clone(), risk, "denied", None);
            return tool_error_envelope(format!("denied by security policy: {reason}"));
        }

        let Some(tool) = self.tools.get(&tc.name) else {
            return tool_error_envelope(format!("unknown tool '{}'", tc.name));
        };

        let mut events = tool.execute(thread_id, tc.input.clone()).await;
        let mut terminal = None;
        while let Some(event) = events.recv().await {
            if event.is_terminal() {
                terminal = Some(event);
                break;
            }
        }

        match terminal {
            Some(ToolEvent::Done { metadata, prompt }) => {
                self.security.log_action(&tc.name, tc.input.clone(), risk, "allowed", Some(&prompt));
                json!({ "status": "done", "metadata": metadata, "prompt": prompt })
            }
            Some(ToolEvent::Error { message, prompt }) => {
                self.security.log_action(&tc.name, tc.input.clone(), risk, "failed", Some(&message));
                json!({ "status": "error", "error": { "message": message }, "prompt": prompt })
            }
            Some(ToolEvent::Pending { .. }) | None => {
                tool_error_envelope(format!("tool '{}' closed its event stream without a terminal event", tc.name))
            }
        }
    }

    /// Streams one model turn to completion: drains text/reasoning/tool-call
    /// deltas, forwarding text and reasoning live, and assembles tool calls
    /// from their per-index delta fragments.
    async fn run_one_step(
        &self,
        messages: &[ModelMessage],
        writer: &mpsc::Sender<UiEvent>,
    ) -> Result<StepResult, AgentLoopError> {
        let tools: Vec<ToolSpec> = self
            .tools
            .list()
            .into_iter()
            .map(|t| ToolSpec { name: t.name, description: t.description, input_schema: t.input_schema })
            .collect();

        let request = AgentCompletionRequest {
            model: self.config.model.clone(),
            messages: messages.to_vec(),
            tools,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let mut stream = self.provider.stream_agentic(request).await.map_err(AgentLoopError::Model)?;

        let mut text = String::new();
        let mut pending: HashMap<u32, PendingToolCall> = HashMap::new();
        let mut stop_reason = StopReason::Stop;

        while let Some(event) = stream.next().await {
            match event.map_err(AgentLoopError::Model)? {
                AgentStreamEvent::TextDelta { delta } => {
                    text.push_str(&delta);
                    let _ = writer.send(UiEvent::TextDelta { delta }).await;
                }
                AgentStreamEvent::ReasoningDelta { delta } => {
                    let _ = writer.send(UiEvent::ReasoningDelta { delta }).await;
                }
                AgentStreamEvent::ToolCallDelta { index, id, name, arguments_delta } => {
                    let entry = pending.entry(index).or_default();
                    if !id.is_empty() {
                        entry.id = id;
                    }
                    if !name.is_empty() {
                        entry.name = name;
                    }
                    entry.args_buf.push_str(&arguments_delta);
                }
                AgentStreamEvent::Usage { .. } => {}
                AgentStreamEvent::Done { stop_reason: reason } => {
                    stop_reason = reason;
                    break;
                }
                AgentStreamEvent::Error { message } => return Err(AgentLoopError::Model(message)),
            }
        }

        let mut indices: Vec<u32> = pending.keys().copied().collect();
        indices.sort_unstable();
        let mut tool_calls = Vec::with_capacity(indices.len());
        for (i, index) in indices.into_iter().enumerate() {
            let ptc = pending.remove(&index).expect("index came from this map's own keys");
            if ptc.name.is_empty() {
                warn!(tool_call_index = index, "dropping tool call with empty name from model");
                continue;
            }
            let mut tc = ptc.finish();
            if tc.id.is_empty() {
                tc.id = format!("tc_synthetic_{i}");
            }
            tool_calls.push(tc);
        }

        Ok(StepResult { text, tool_calls, stop_reason })
    }
}

struct StepResult {
    text: String,
    tool_calls: Vec<ToolCall>,
    #[allow(dead_code)]
    stop_reason: StopReason,
}

/// Accumulates one parallel tool call's deltas, keyed by the provider's
/// `index`. Only the first delta for a given index carries `id`/`name`.
#[derive(Default)]
struct PendingToolCall {
    id: String,
    name: String,
    args_buf: String,
}

impl PendingToolCall {
    fn finish(self) -> ToolCall {
        let input = if self.args_buf.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(&self.args_buf).unwrap_or_else(|_| {
                // The model may have truncated a streamed argument buffer;
                // try closing it off before giving up.
                let mut patched = self.args_buf.clone();
                patched.push('}');
                serde_json::from_str(&patched).unwrap_or_else(|_| {
                    warn!(tool_name = %self.name, "model sent unparseable tool arguments; substituting {{}}");
                    Value::Object(Default::default())
                })
            })
        };
        ToolCall { id: self.id, name: self.name, input }
    }
}

fn tool_error_envelope(message: String) -> Value {
    json!({ "status": "error", "error": { "message": message }, "prompt": message })
}
