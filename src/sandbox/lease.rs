use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::kv::KvStore;

use super::{
    heartbeat_key,
    traits::{BashOptions, BashResult, FsEntry, GitOp, GitResult, GrepOptions, GrepResult, Result, SandboxAdapter},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxStatus {
    Active,
    Stopped,
}

/// Owns the heartbeat protocol that keeps a sandbox alive while its thread
/// is in use, and lets it be reclaimed once idle past `auto_stop_delay`.
pub struct LeaseManager {
    kv: Arc<dyn KvStore>,
    auto_stop_delay: Duration,
}

impl LeaseManager {
    /// `auto_stop_delay` is clamped to at least 60s, matching the default a
    /// sandbox is kept warm for between uses.
    pub fn new(kv: Arc<dyn KvStore>, auto_stop_delay: Duration) -> Self {
        Self {
            kv,
            auto_stop_delay: auto_stop_delay.max(Duration::from_secs(60)),
        }
    }

    /// Idempotent: returns the existing lease if `sandbox_id` already has a
    /// live heartbeat, otherwise starts a fresh one.
    pub async fn connect_or_create(&self, sandbox_id: &str) -> SandboxStatus {
        self.keep_alive(sandbox_id).await;
        SandboxStatus::Active
    }

    /// Refreshes the heartbeat TTL. Must be called before every `fs`,
    /// `shell`, or `git` operation against the sandbox it guards.
    pub async fn keep_alive(&self, sandbox_id: &str) {
        self.kv
            .set_px(&heartbeat_key(sandbox_id), "1", self.auto_stop_delay)
            .await;
    }

    pub async fn stop(&self, sandbox_id: &str) {
        self.kv.del(&heartbeat_key(sandbox_id)).await;
    }

    pub async fn get_status(&self, sandbox_id: &str) -> SandboxStatus {
        match self.kv.get(&heartbeat_key(sandbox_id)).await {
            Some(_) => SandboxStatus::Active,
            None => SandboxStatus::Stopped,
        }
    }
}

/// Wraps a [`SandboxAdapter`] so every call refreshes its lease first.
pub struct LeasedSandbox {
    pub sandbox_id: String,
    inner: Arc<dyn SandboxAdapter>,
    lease: Arc<LeaseManager>,
}

impl LeasedSandbox {
    pub fn new(sandbox_id: String, inner: Arc<dyn SandboxAdapter>, lease: Arc<LeaseManager>) -> Self {
        Self { sandbox_id, inner, lease }
    }
}

#[async_trait]
impl SandboxAdapter for LeasedSandbox {
    async fn readdir(&self, path: &str, recursive: bool, ignores: &[String]) -> Result<Vec<FsEntry>> {
        self.lease.keep_alive(&self.sandbox_id).await;
        self.inner.readdir(path, recursive, ignores).await
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.lease.keep_alive(&self.sandbox_id).await;
        self.inner.read_file(path).await
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        self.lease.keep_alive(&self.sandbox_id).await;
        self.inner.write_file(path, data).await
    }

    async fn mkdir(&self, path: &str) -> Result<()> {
        self.lease.keep_alive(&self.sandbox_id).await;
        self.inner.mkdir(path).await
    }

    async fn rm(&self, path: &str, recursive: bool) -> Result<()> {
        self.lease.keep_alive(&self.sandbox_id).await;
        self.inner.rm(path, recursive).await
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.lease.keep_alive(&self.sandbox_id).await;
        self.inner.rename(from, to).await
    }

    async fn stat(&self, path: &str) -> Result<FsEntry> {
        self.lease.keep_alive(&self.sandbox_id).await;
        self.inner.stat(path).await
    }

    async fn exists(&self, path: &str) -> bool {
        self.lease.keep_alive(&self.sandbox_id).await;
        self.inner.exists(path).await
    }

    async fn glob(&self, patterns: &[String], cwd: Option<&str>) -> Result<Vec<String>> {
        self.lease.keep_alive(&self.sandbox_id).await;
        self.inner.glob(patterns, cwd).await
    }

    async fn bash(&self, command: &str, opts: BashOptions) -> Result<BashResult> {
        self.lease.keep_alive(&self.sandbox_id).await;
        self.inner.bash(command, opts).await
    }

    async fn grep(&self, pattern: &str, opts: GrepOptions) -> Result<GrepResult> {
        self.lease.keep_alive(&self.sandbox_id).await;
        self.inner.grep(pattern, opts).await
    }

    async fn git(&self, op: GitOp) -> Result<GitResult> {
        self.lease.keep_alive(&self.sandbox_id).await;
        self.inner.git(op).await
    }
}
