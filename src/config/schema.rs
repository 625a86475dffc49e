//! TOML configuration schema for the agent runtime.
//!
//! All fields have `#[serde(default)]` so a partially-filled `config.toml`
//! works correctly.  Missing sections fall back to their `Default` impl.
//!
//! Example `~/.agentstart/config.toml`:
//! ```toml
//! [provider]
//! default_id = "openai"
//! default_model = "gpt-4o-mini"
//!
//! [security]
//! autonomy_level = "supervised"
//!
//! [agent]
//! instructions = "You are a careful coding assistant."
//! max_steps = 100
//!
//! [runtime]
//! app_name = "my-app"
//! ```

use serde::{Deserialize, Serialize};

// ─── ProviderConfig ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    /// ID of the default LLM provider (e.g. `"openai"`, `"anthropic"`).
    pub default_id: String,
    /// Default model identifier (e.g. `"gpt-4o-mini"`, `"claude-3-haiku"`).
    pub default_model: String,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Maximum retry attempts on transient errors.
    pub max_retries: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            default_id: "openai".to_owned(),
            default_model: "gpt-4o-mini".to_owned(),
            request_timeout_secs: 60,
            max_retries: 3,
        }
    }
}

// ─── SandboxMode ─────────────────────────────────────────────────────────────

/// Controls which tool executions are sandboxed in containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SandboxMode {
    /// No sandboxing - all tools run directly on the host.
    Off,
    /// Only non-main-thread tools are sandboxed (tools spawned by agents).
    #[default]
    NonMain,
    /// All tool executions are sandboxed in containers.
    All,
}

impl SandboxMode {
    /// Returns true if this mode requires sandboxing for tool execution.
    pub fn is_sandboxed(&self, is_main_thread: bool) -> bool {
        match self {
            SandboxMode::Off => false,
            SandboxMode::NonMain => !is_main_thread,
            SandboxMode::All => true,
        }
    }
}

// ─── SandboxConfig ───────────────────────────────────────────────────────────

/// Configuration for container-based tool sandboxing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SandboxConfig {
    /// Which tools should be sandboxed.
    pub mode: SandboxMode,
    /// Default container image for sandboxed tools.
    pub default_image: String,
    /// Memory limit in MB for sandboxed containers.
    pub memory_limit_mb: Option<u64>,
    /// Whether to disable network access in sandboxed containers.
    pub network_disabled: bool,
    /// Timeout in seconds for sandboxed tool execution.
    pub timeout_secs: Option<u64>,
    /// Additional volume mounts (host_path:container_path format).
    pub volumes: Vec<String>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            mode: SandboxMode::default(),
            default_image: "alpine:3.20".to_string(),
            memory_limit_mb: Some(256),
            network_disabled: true,
            timeout_secs: Some(60),
            volumes: Vec::new(),
        }
    }
}

// ─── SecurityConfig ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SecurityConfig {
    /// Autonomy level: `"readonly"`, `"supervised"`, or `"autonomous"`.
    pub autonomy_level: String,
    /// Optional workspace root path (restricts file tool access).
    pub workspace_root: Option<String>,
    /// Commands blocked regardless of autonomy level.
    pub blocked_commands: Vec<String>,
    /// Rate limit: max tool calls per minute.
    pub rate_limit_per_minute: u32,
    /// Rate limit: max tool calls per hour.
    pub rate_limit_per_hour: u32,
    /// Sandbox configuration for tool isolation.
    pub sandbox: SandboxConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            autonomy_level: "supervised".to_owned(),
            workspace_root: None,
            blocked_commands: Vec::new(),
            rate_limit_per_minute: 60,
            rate_limit_per_hour: 600,
            sandbox: SandboxConfig::default(),
        }
    }
}

// ─── TitleGenSettings / SuggestionsSettings ───────────────────────────────────

/// `generateTitle` config: the model and instructions used to name a thread
/// after its first message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TitleGenSettings {
    pub model: String,
    pub instructions: String,
}

impl Default for TitleGenSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            instructions: "Summarize the user's first message into a short thread title.".to_owned(),
        }
    }
}

/// `generateSuggestions` config: the model, instructions, and cap on
/// follow-up suggestions generated after a final assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SuggestionsSettings {
    pub model: String,
    pub instructions: String,
    pub limit: usize,
}

impl Default for SuggestionsSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            instructions: "Suggest natural follow-up questions the user might ask next.".to_owned(),
            limit: 3,
        }
    }
}

// ─── AgentConfig ──────────────────────────────────────────────────────────────

/// Options passed to every agent turn: system instructions, the default
/// model, the loop's step cap, and the optional title/suggestion generators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    /// System instructions prepended to every thread (required upstream;
    /// defaults to empty here so a partial config still parses).
    pub instructions: String,
    /// Optional `AGENTS.md`-style project prompt text, injected as a second
    /// system message right after `instructions` when present.
    pub agents_md_prompt: Option<String>,
    /// Default model identifier used when a turn doesn't override one.
    pub model: String,
    /// Step cap passed to `agent::step_count_is`.
    pub max_steps: usize,
    /// Seconds of inactivity before the loop auto-stops a turn (`autoStopDelay`).
    pub auto_stop_delay_secs: Option<u64>,
    /// Overall per-turn timeout in seconds.
    pub timeout_secs: Option<u64>,
    pub generate_title: Option<TitleGenSettings>,
    pub generate_suggestions: Option<SuggestionsSettings>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            instructions: String::new(),
            agents_md_prompt: None,
            model: "gpt-4o-mini".to_owned(),
            max_steps: 100,
            auto_stop_delay_secs: None,
            timeout_secs: Some(300),
            generate_title: None,
            generate_suggestions: None,
        }
    }
}

// ─── RuntimeConfig ────────────────────────────────────────────────────────────

/// `welcome` config: the greeting and starter suggestions shown on a new
/// thread before the first user message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct WelcomeConfig {
    pub description: String,
    pub suggestions: Vec<String>,
}

/// `models` config: the default model plus the list offered to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ModelsConfig {
    pub default: String,
    pub available: Vec<String>,
}

/// `blob` config: attachment upload limits enforced at the gateway boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BlobConfig {
    /// Storage backend identifier (e.g. `"local"`, `"s3"`).
    pub provider: String,
    pub max_file_size: u64,
    pub allowed_mime_types: Vec<String>,
    pub max_files: u32,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            provider: "local".to_owned(),
            max_file_size: 25 * 1024 * 1024,
            allowed_mime_types: Vec::new(),
            max_files: 8,
        }
    }
}

/// Host-facing identity and surface options: what the embedding application
/// calls itself, where its gateway lives, and what it offers callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RuntimeConfig {
    pub app_name: String,
    pub base_url: Option<String>,
    pub welcome: WelcomeConfig,
    pub models: ModelsConfig,
    pub blob: BlobConfig,
}

// ─── AppConfig ────────────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// Loaded from `~/.agentstart/config.toml`, falling back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub security: SecurityConfig,
    pub agent: AgentConfig,
    pub runtime: RuntimeConfig,
}
