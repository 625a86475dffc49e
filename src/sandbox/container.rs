use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use crate::modules::container::{ContainerConfig, ContainerRuntime};

use super::{
    local::LocalSandbox,
    traits::{
        BashOptions, BashResult, FsEntry, GitOp, GitResult, GrepOptions, GrepResult, Result,
        SandboxAdapter, SandboxError,
    },
};

/// [`SandboxAdapter`] that runs `bash` inside a container while `fs` and
/// `git` operate directly on the bind-mounted workspace on the host —
/// container isolation buys command execution safety without paying for a
/// round trip on every file read.
pub struct ContainerSandbox {
    local: LocalSandbox,
    runtime: Arc<dyn ContainerRuntime>,
    image: String,
    host_root: String,
}

impl ContainerSandbox {
    pub fn new(host_root: impl Into<String>, runtime: Arc<dyn ContainerRuntime>, image: impl Into<String>) -> Self {
        let host_root = host_root.into();
        Self {
            local: LocalSandbox::new(host_root.clone()),
            runtime,
            image: image.into(),
            host_root,
        }
    }

    pub fn is_available(&self) -> bool {
        self.runtime.is_available()
    }
}

#[async_trait]
impl SandboxAdapter for ContainerSandbox {
    async fn readdir(&self, path: &str, recursive: bool, ignores: &[String]) -> Result<Vec<FsEntry>> {
        self.local.readdir(path, recursive, ignores).await
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.local.read_file(path).await
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        self.local.write_file(path, data).await
    }

    async fn mkdir(&self, path: &str) -> Result<()> {
        self.local.mkdir(path).await
    }

    async fn rm(&self, path: &str, recursive: bool) -> Result<()> {
        self.local.rm(path, recursive).await
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.local.rename(from, to).await
    }

    async fn stat(&self, path: &str) -> Result<FsEntry> {
        self.local.stat(path).await
    }

    async fn exists(&self, path: &str) -> bool {
        self.local.exists(path).await
    }

    async fn glob(&self, patterns: &[String], cwd: Option<&str>) -> Result<Vec<String>> {
        self.local.glob(patterns, cwd).await
    }

    async fn bash(&self, command: &str, opts: BashOptions) -> Result<BashResult> {
        let timeout_ms = opts.timeout_ms.clamp(0, 600_000).max(1);
        let workdir = opts.cwd.as_deref().unwrap_or("/workspace");
        let mut env = std::collections::HashMap::new();
        for (k, v) in &opts.env {
            env.insert(k.clone(), v.clone());
        }
        let config = ContainerConfig {
            image: self.image.clone(),
            command: "bash".to_string(),
            args: vec!["-c".to_string(), command.to_string()],
            env,
            volumes: vec![format!("{}:/workspace", self.host_root)],
            memory_limit_mb: Some(256),
            network_disabled: true,
            timeout_secs: Some(timeout_ms / 1000),
        };
        let _ = workdir;

        let mut child = self
            .runtime
            .spawn(&config)
            .await
            .map_err(SandboxError::RuntimeUnavailable)?;

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();
        let wait = async {
            let mut stdout = String::new();
            let mut stderr = String::new();
            if let Some(mut out) = stdout_pipe.take() {
                let _ = out.read_to_string(&mut stdout).await;
            }
            if let Some(mut err) = stderr_pipe.take() {
                let _ = err.read_to_string(&mut stderr).await;
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((stdout, stderr, status.code().unwrap_or(-1)))
        };

        match tokio::time::timeout(Duration::from_millis(timeout_ms), wait).await {
            Ok(Ok((stdout, stderr, exit_code))) => Ok(BashResult { stdout, stderr, exit_code, timed_out: false }),
            Ok(Err(e)) => Err(SandboxError::Io(e)),
            Err(_) => Ok(BashResult { stdout: String::new(), stderr: String::new(), exit_code: -1, timed_out: true }),
        }
    }

    async fn grep(&self, pattern: &str, opts: GrepOptions) -> Result<GrepResult> {
        self.local.grep(pattern, opts).await
    }

    async fn git(&self, op: GitOp) -> Result<GitResult> {
        self.local.git(op).await
    }
}

