use std::time::SystemTime;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("path not found: {0}")]
    NotFound(String),
    #[error("path escapes workspace: {0}")]
    PathTraversal(String),
    #[error("command timed out after {0}ms")]
    Timeout(u64),
    #[error("container runtime unavailable: {0}")]
    RuntimeUnavailable(String),
    #[error("git operation failed: {0}")]
    Git(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SandboxError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    File,
    Dir,
    Symlink,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsEntry {
    pub name: String,
    pub path: String,
    pub entry_type: EntryType,
    pub size: u64,
    pub modified_at: Option<SystemTime>,
}

#[derive(Debug, Clone, Default)]
pub struct BashOptions {
    pub cwd: Option<String>,
    /// Caller-requested timeout in ms; clamped to `[0, 600_000]` with a
    /// default of 120_000 by the tool layer before reaching the sandbox.
    pub timeout_ms: u64,
    pub env: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BashResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GrepOptions {
    pub path: Option<String>,
    pub glob: Option<String>,
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrepMatch {
    pub path: String,
    pub line: u64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GrepResult {
    pub matches: Vec<GrepMatch>,
    pub truncated: bool,
}

/// One git subcommand invocation. Each variant maps 1:1 onto the git
/// facade's subcontract list.
#[derive(Debug, Clone)]
pub enum GitOp {
    Status,
    Add(Vec<String>),
    Commit { message: String, all: bool },
    Push { remote: Option<String>, branch: Option<String>, force: bool },
    Pull { remote: Option<String>, branch: Option<String> },
    Fetch { remote: Option<String> },
    Checkout { target: String, create: bool },
    Branch { name: Option<String> },
    Merge { branch: String },
    Rebase { onto: String },
    Log { max_count: Option<u32> },
    Diff { staged: bool, path: Option<String> },
    Stash { pop: bool },
    Tag { name: Option<String> },
    Remote,
    Reset { target: String, hard: bool },
    Revert { commit: String },
    CherryPick { commit: String },
    Clean { force: bool },
    Config { key: String, value: Option<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub hash: Option<String>,
}

/// One remote execution environment, exposing the three facades an agent
/// thread drives: filesystem, shell, and git. A [`super::lease::LeaseManager`]
/// wraps every call with a heartbeat so idle sandboxes can be reclaimed.
#[async_trait]
pub trait SandboxAdapter: Send + Sync {
    async fn readdir(&self, path: &str, recursive: bool, ignores: &[String]) -> Result<Vec<FsEntry>>;
    async fn read_file(&self, path: &str) -> Result<Vec<u8>>;
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()>;
    async fn mkdir(&self, path: &str) -> Result<()>;
    async fn rm(&self, path: &str, recursive: bool) -> Result<()>;
    async fn rename(&self, from: &str, to: &str) -> Result<()>;
    async fn stat(&self, path: &str) -> Result<FsEntry>;
    async fn exists(&self, path: &str) -> bool;
    async fn glob(&self, patterns: &[String], cwd: Option<&str>) -> Result<Vec<String>>;

    async fn bash(&self, command: &str, opts: BashOptions) -> Result<BashResult>;
    async fn grep(&self, pattern: &str, opts: GrepOptions) -> Result<GrepResult>;

    async fn git(&self, op: GitOp) -> Result<GitResult>;
}
