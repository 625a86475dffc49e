//! `ThreadCoordinator` — the public `thread.stream` entry point. Ties
//! together the memory adapter, sandbox lease, tool registry, and agent
//! loop into one UI event stream per turn.

use std::{path::PathBuf, sync::Arc};

use chrono::Utc;
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    agent::{AgentLoop, AgentLoopConfig, LoopOutcome, UiEvent},
    ai::{
        provider::LLMProvider,
        types::{CompletionRequest, Message as AiMessage},
    },
    memory::{
        generate_id,
        model::{Message, MessagePart, Role, Thread, Visibility},
        MemoryAdapter, MemoryError, Model, WhereClause,
    },
    message::{AssemblerError, MessageAssembler, ModelContentPart, ModelMessage},
    security::SecurityPolicy,
    sandbox::{LeaseManager, LeasedSandbox, LocalSandbox, SandboxAdapter},
    tools::{register_builtin_tools, ToolRegistry},
};

/// Input to [`ThreadCoordinator::stream`].
#[derive(Debug, Clone)]
pub struct ThreadStreamRequest {
    pub thread_id: String,
    pub user_id: String,
    pub message: String,
    pub model: Option<String>,
}

/// A model used purely for title generation: a cheap, separate completion
/// call against the new thread's first user message.
#[derive(Debug, Clone)]
pub struct TitleGenConfig {
    pub model: String,
    pub instructions: String,
}

/// Follow-up prompt generation, run once the turn's final assistant message
/// is known.
#[derive(Debug, Clone)]
pub struct SuggestionsConfig {
    pub model: String,
    pub instructions: String,
    pub limit: usize,
}

#[derive(Clone)]
pub struct ThreadCoordinatorConfig {
    pub instructions: String,
    pub agents_md_prompt: Option<String>,
    pub agent_loop: AgentLoopConfig,
    pub generate_title: Option<TitleGenConfig>,
    pub generate_suggestions: Option<SuggestionsConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("thread not found")]
    NotFound,
    #[error("thread is private and does not belong to the requesting user")]
    Forbidden,
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Assembler(#[from] AssemblerError),
    #[error("agent error: {0}")]
    Agent(#[from] crate::agent::AgentLoopError),
}

/// Ties the memory adapter, sandbox lease manager, tool registry, and agent
/// loop together behind the single `thread.stream` entry point.
pub struct ThreadCoordinator {
    memory: Arc<dyn MemoryAdapter>,
    provider: Arc<dyn LLMProvider>,
    security: Arc<SecurityPolicy>,
    lease: Arc<LeaseManager>,
    workspace_root: PathBuf,
    config: ThreadCoordinatorConfig,
}

impl ThreadCoordinator {
    pub fn new(
        memory: Arc<dyn MemoryAdapter>,
        provider: Arc<dyn LLMProvider>,
        security: Arc<SecurityPolicy>,
        lease: Arc<LeaseManager>,
        workspace_root: impl Into<PathBuf>,
        config: ThreadCoordinatorConfig,
    ) -> Self {
        Self { memory, provider, security, lease, workspace_root: workspace_root.into(), config }
    }

    /// Looks the thread up (404/403 short-circuit the call), then spawns
    /// the turn and returns a live stream of [`UiEvent`]s. Dropping the
    /// returned stream is the cancellation signal: the spawned turn
    /// notices via the writer channel closing and stops at the next
    /// suspension point.
    pub async fn stream(&self, request: ThreadStreamRequest) -> Result<ReceiverStream<UiEvent>, CoordinatorError> {
        let thread_value = self
            .memory
            .find_one(Model::Thread, &[WhereClause::eq("id", json!(request.thread_id))])
            .await?;
        let Some(thread_value) = thread_value else {
            return Err(CoordinatorError::NotFound);
        };
        let thread: Thread = serde_json::from_value(thread_value).map_err(MemoryError::Serialization)?;
        if thread.visibility == Visibility::Private && thread.user_id != request.user_id {
            return Err(CoordinatorError::Forbidden);
        }

        let (tx, rx) = mpsc::channel(128);
        let (cancel_tx, cancel_rx) = oneshot::channel();

        // Closing the UI writer is the cancellation signal: watch for the
        // receiver going away and fire the loop's cancel handle.
        let watcher = tx.clone();
        tokio::spawn(async move {
            watcher.closed().await;
            let _ = cancel_tx.send(());
        });

        let memory = self.memory.clone();
        let provider = self.provider.clone();
        let security = self.security.clone();
        let lease = self.lease.clone();
        let workspace_root = self.workspace_root.clone();
        let config = self.config.clone();

        tokio::spawn(async move {
            let turn = Turn { memory, provider, security, lease, workspace_root, config };
            if let Err(e) = turn.run(thread, request, tx.clone(), cancel_rx).await {
                let _ = tx.send(UiEvent::Error { message: e.to_string() }).await;
            }
        });

        Ok(ReceiverStream::new(rx))
    }
}

/// Owns the state of a single in-flight turn. Split out from
/// [`ThreadCoordinator`] so `stream` can hand ownership of cloned `Arc`s to
/// the spawned task without requiring `Arc<ThreadCoordinator>` itself.
struct Turn {
    memory: Arc<dyn MemoryAdapter>,
    provider: Arc<dyn LLMProvider>,
    security: Arc<SecurityPolicy>,
    lease: Arc<LeaseManager>,
    workspace_root: PathBuf,
    config: ThreadCoordinatorConfig,
}

impl Turn {
    async fn run(
        &self,
        mut thread: Thread,
        request: ThreadStreamRequest,
        tx: mpsc::Sender<UiEvent>,
        cancel_rx: oneshot::Receiver<()>,
    ) -> Result<(), CoordinatorError> {
        let assembler = MessageAssembler::new(self.memory.clone());

        // Step 2: resolve a sandbox, reusing the thread's cached id if any.
        let sandbox_id = match &thread.sandbox_id {
            Some(id) => id.clone(),
            None => format!("sbx_{}", generate_id()),
        };
        self.lease.connect_or_create(&sandbox_id).await;
        if thread.sandbox_id.as_deref() != Some(sandbox_id.as_str()) {
            thread.sandbox_id = Some(sandbox_id.clone());
            self.persist_thread(&mut thread).await?;
        }
        let local: Arc<dyn SandboxAdapter> = Arc::new(LocalSandbox::new(self.workspace_root.join(&sandbox_id)));
        let sandbox: Arc<dyn SandboxAdapter> = Arc::new(LeasedSandbox::new(sandbox_id, local, self.lease.clone()));

        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry, sandbox, self.memory.clone());
        let registry = Arc::new(registry);

        // Persist the incoming user message before running the loop, so a
        // crash mid-turn still leaves it in history.
        let incoming = Message {
            id: generate_id(),
            thread_id: thread.id.clone(),
            role: Role::User,
            parts: vec![MessagePart::Text { text: request.message.clone() }],
            attachments: vec![],
            metadata: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let prior = assembler.load_thread(&thread.id).await?;
        let is_first_user_message = prior.iter().all(|m| m.role != Role::User);
        let history = assembler.get_complete_messages(&thread.id, incoming.clone()).await?;
        assembler.upsert_message(&incoming).await?;

        // Step 3: compose the model-message prefix.
        let mut prefix = vec![ModelMessage::new(
            Role::System,
            vec![ModelContentPart::Text { text: self.config.instructions.clone() }],
        )];
        if let Some(agents_md) = &self.config.agents_md_prompt {
            prefix.push(ModelMessage::new(
                Role::System,
                vec![ModelContentPart::Text { text: agents_md.clone() }],
            ));
        }
        let mut converted = MessageAssembler::convert_to_model_messages(&history, self.provider.supports_reasoning());
        MessageAssembler::fix_empty_model_messages(&mut converted);
        MessageAssembler::add_provider_options_to_messages(&mut converted, self.provider.supports_cache_control());
        prefix.extend(converted);

        // Step 4: title the thread on its first message.
        if is_first_user_message {
            if let Some(title_cfg) = self.config.generate_title.clone() {
                match self.generate_title(&title_cfg, &request.message).await {
                    Ok(title) => {
                        thread.title = title.clone();
                        self.persist_thread(&mut thread).await?;
                        let _ = tx.send(UiEvent::TitleUpdate { title }).await;
                    }
                    Err(e) => tracing::warn!(error = %e, "title generation failed, keeping default title"),
                }
            }
        }

        // Step 5: run the agent loop, merging its events into the writer.
        let mut agent_config = self.config.agent_loop.clone();
        if let Some(model) = &request.model {
            agent_config.model = model.clone();
        }
        let agent_loop = AgentLoop::new(self.provider.clone(), registry, self.security.clone(), agent_config);
        let message_id = generate_id();
        let _ = tx.send(UiEvent::MessageStart { id: message_id.clone() }).await;
        let (parts, outcome) = agent_loop.run(&thread.id, prefix, tx.clone(), cancel_rx).await?;
        let _ = tx.send(UiEvent::MessageFinish { id: message_id.clone() }).await;

        // Step 6: persist the assistant message, if it produced anything.
        if !parts.is_empty() {
            let assistant_message = Message {
                id: message_id,
                thread_id: thread.id.clone(),
                role: Role::Assistant,
                parts: parts.clone(),
                attachments: vec![],
                metadata: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            assembler.upsert_message(&assistant_message).await?;
        }

        // Step 7: offer follow-up prompts once the turn reached a natural end.
        if matches!(outcome, LoopOutcome::Final) {
            if let Some(sugg_cfg) = self.config.generate_suggestions.clone() {
                match self.generate_suggestions(&sugg_cfg, &request.message, &parts).await {
                    Ok(prompts) if !prompts.is_empty() => {
                        let _ = tx.send(UiEvent::Suggestions { prompts }).await;
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "suggestion generation failed"),
                }
            }
        }

        Ok(())
    }

    async fn persist_thread(&self, thread: &mut Thread) -> Result<(), CoordinatorError> {
        thread.updated_at = Utc::now();
        let value = serde_json::to_value(&*thread).map_err(MemoryError::Serialization)?;
        self.memory.update(Model::Thread, &[WhereClause::eq("id", json!(thread.id))], value).await?;
        Ok(())
    }

    async fn generate_title(&self, cfg: &TitleGenConfig, first_message: &str) -> Result<String, String> {
        let request = CompletionRequest::new(
            cfg.model.clone(),
            vec![AiMessage::system(cfg.instructions.clone()), AiMessage::user(first_message)],
        )
        .with_max_tokens(40);
        let response = self.provider.complete(request).await?;
        let title = response.content.trim().trim_matches('"').to_string();
        if title.is_empty() {
            return Err("model returned an empty title".to_string());
        }
        Ok(title)
    }

    async fn generate_suggestions(
        &self,
        cfg: &SuggestionsConfig,
        user_message: &str,
        assistant_parts: &[MessagePart],
    ) -> Result<Vec<String>, String> {
        let assistant_text: String = assistant_parts
            .iter()
            .filter_map(|p| match p {
                MessagePart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "User asked: {user_message}\n\nAssistant replied: {assistant_text}\n\nSuggest up to {} natural follow-up questions the user might ask next, one per line, no numbering.",
            cfg.limit
        );
        let request = CompletionRequest::new(
            cfg.model.clone(),
            vec![AiMessage::system(cfg.instructions.clone()), AiMessage::user(prompt)],
        );
        let response = self.provider.complete(request).await?;
        let prompts: Vec<String> = response
            .content
            .lines()
            .map(|line| line.trim().trim_start_matches(['-', '*', '•']).trim().to_string())
            .filter(|line| !line.is_empty())
            .take(cfg.limit)
            .collect();
        Ok(prompts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::{AgentStreamResponse, StreamResponse};
    use crate::ai::types::{AgentCompletionRequest, AgentStreamEvent, CompletionResponse, StopReason};
    use crate::agent::step_count_is;
    use crate::memory::InMemoryAdapter;
    use crate::security::AutonomyLevel;
    use async_trait::async_trait;
    use futures::StreamExt;
    use tempfile::tempdir;

    /// A fixed-script provider: `complete` always returns `scripted_title`,
    /// `stream_agentic` always emits one fixed text turn.
    struct FixedProvider {
        scripted_title: String,
    }

    #[async_trait]
    impl LLMProvider for FixedProvider {
        async fn complete(&self, _request: CompletionRequest) -> crate::ai::provider::Result<CompletionResponse> {
            Ok(CompletionResponse {
                content: self.scripted_title.clone(),
                model: "test-model".to_string(),
                usage: None,
                finish_reason: Some("stop".to_string()),
            })
        }

        async fn stream(&self, _request: CompletionRequest) -> crate::ai::provider::Result<StreamResponse> {
            unimplemented!("not exercised by these tests")
        }

        async fn stream_agentic(&self, _request: AgentCompletionRequest) -> crate::ai::provider::Result<AgentStreamResponse> {
            let events = vec![
                AgentStreamEvent::TextDelta { delta: "hello there".to_string() },
                AgentStreamEvent::Done { stop_reason: StopReason::Stop },
            ];
            Ok(Box::pin(tokio_stream::iter(events.into_iter().map(Ok))))
        }

        fn context_limit(&self) -> usize {
            128_000
        }

        fn supports_tools(&self) -> bool {
            true
        }

        fn provider_name(&self) -> &str {
            "fixed"
        }
    }

    fn test_coordinator(provider: Arc<dyn LLMProvider>, root: &std::path::Path) -> (ThreadCoordinator, Arc<dyn MemoryAdapter>) {
        let memory: Arc<dyn MemoryAdapter> = Arc::new(InMemoryAdapter::default());
        let security = Arc::new(SecurityPolicy::new(AutonomyLevel::Full, None, vec![], 3600, 1000));
        let kv: Arc<dyn crate::kv::KvStore> = Arc::new(crate::kv::InMemoryKv::new());
        let lease = Arc::new(LeaseManager::new(kv, std::time::Duration::from_secs(60)));
        let config = ThreadCoordinatorConfig {
            instructions: "You are a helpful assistant.".to_string(),
            agents_md_prompt: None,
            agent_loop: AgentLoopConfig { stop_when: step_count_is(100), ..Default::default() },
            generate_title: Some(TitleGenConfig { model: "title-model".to_string(), instructions: "Title this.".to_string() }),
            generate_suggestions: None,
        };
        let coordinator = ThreadCoordinator::new(memory.clone(), provider, security, lease, root, config);
        (coordinator, memory)
    }

    #[tokio::test]
    async fn unknown_thread_is_not_found() {
        let dir = tempdir().unwrap();
        let provider: Arc<dyn LLMProvider> = Arc::new(FixedProvider { scripted_title: "x".to_string() });
        let (coordinator, _memory) = test_coordinator(provider, dir.path());

        let result = coordinator
            .stream(ThreadStreamRequest {
                thread_id: "missing".to_string(),
                user_id: "u1".to_string(),
                message: "hi".to_string(),
                model: None,
            })
            .await;

        assert!(matches!(result, Err(CoordinatorError::NotFound)));
    }

    #[tokio::test]
    async fn private_thread_rejects_foreign_user() {
        let dir = tempdir().unwrap();
        let provider: Arc<dyn LLMProvider> = Arc::new(FixedProvider { scripted_title: "x".to_string() });
        let (coordinator, memory) = test_coordinator(provider, dir.path());

        let thread = Thread::new("t1", "owner");
        memory.create(Model::Thread, serde_json::to_value(&thread).unwrap()).await.unwrap();

        let result = coordinator
            .stream(ThreadStreamRequest {
                thread_id: "t1".to_string(),
                user_id: "someone-else".to_string(),
                message: "hi".to_string(),
                model: None,
            })
            .await;

        assert!(matches!(result, Err(CoordinatorError::Forbidden)));
    }

    #[tokio::test]
    async fn first_message_titles_thread_before_text_deltas() {
        let dir = tempdir().unwrap();
        let provider: Arc<dyn LLMProvider> = Arc::new(FixedProvider { scripted_title: "Refactor foo.ts".to_string() });
        let (coordinator, memory) = test_coordinator(provider, dir.path());

        let thread = Thread::new("t1", "owner");
        memory.create(Model::Thread, serde_json::to_value(&thread).unwrap()).await.unwrap();

        let mut stream = coordinator
            .stream(ThreadStreamRequest {
                thread_id: "t1".to_string(),
                user_id: "owner".to_string(),
                message: "Help me refactor foo.ts".to_string(),
                model: None,
            })
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event);
        }

        let title_pos = events.iter().position(|e| matches!(e, UiEvent::TitleUpdate { .. }));
        let first_text_pos = events.iter().position(|e| matches!(e, UiEvent::TextDelta { .. }));
        assert!(title_pos.is_some());
        assert!(first_text_pos.is_some());
        assert!(title_pos.unwrap() < first_text_pos.unwrap());

        let stored = memory
            .find_one(Model::Thread, &[WhereClause::eq("id", json!("t1"))])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.get("title").and_then(|v| v.as_str()), Some("Refactor foo.ts"));
    }
}
