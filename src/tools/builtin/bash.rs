use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::sandbox::{BashOptions, GitOp, SandboxAdapter};

use super::super::traits::{Tool, ToolEvent, run_tool};
use super::commit::auto_commit;

const DEFAULT_TIMEOUT_MS: u64 = 120_000;
const MAX_TIMEOUT_MS: u64 = 600_000;
const OUTPUT_CAP: usize = 30_000;

fn truncate(s: String) -> String {
    if s.len() <= OUTPUT_CAP {
        s
    } else {
        format!("{}\n... [truncated]", &s[..OUTPUT_CAP])
    }
}

pub struct BashTool {
    sandbox: Arc<dyn SandboxAdapter>,
}

impl BashTool {
    pub fn new(sandbox: Arc<dyn SandboxAdapter>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "bash"
    }

    fn description(&self) -> &str {
        "Run a shell command in the sandbox workspace."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": { "type": "string" },
                "timeout": { "type": "integer" },
                "description": { "type": "string" }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, _thread_id: &str, args: Value) -> mpsc::Receiver<ToolEvent> {
        let sandbox = self.sandbox.clone();
        let Some(command) = args.get("command").and_then(Value::as_str).map(str::to_string) else {
            return run_tool("running command", || async { Err("missing required argument 'command'".to_string()) });
        };
        let requested = args.get("timeout").and_then(Value::as_u64).unwrap_or(DEFAULT_TIMEOUT_MS);
        let timeout_ms = requested.max(DEFAULT_TIMEOUT_MS).min(MAX_TIMEOUT_MS);
        let description = args.get("description").and_then(Value::as_str).unwrap_or(&command).to_string();

        run_tool(format!("Running: {command}"), move || async move {
            let pre_status = sandbox.git(GitOp::Status).await.ok();

            let result = sandbox
                .bash(&command, BashOptions { cwd: None, timeout_ms, env: vec![] })
                .await
                .map_err(|e| e.to_string())?;

            if result.timed_out {
                return Err(format!("command timed out after {timeout_ms}ms"));
            }

            let stdout = truncate(result.stdout);
            let stderr = truncate(result.stderr);
            let output = if stderr.is_empty() { stdout.clone() } else { format!("{stdout}\n{stderr}") };

            if result.exit_code != 0 {
                return Err(format!("command exited with code {}: {output}", result.exit_code));
            }

            let mut commit_hash = None;
            if let Some(pre) = pre_status {
                if let Ok(post) = sandbox.git(GitOp::Status).await {
                    if post.stdout != pre.stdout {
                        commit_hash = auto_commit(&sandbox, &[], &format!("executed: {command}"), &description, "workspace").await;
                    }
                }
            }

            Ok((output, Some(json!({ "exitCode": result.exit_code, "commitHash": commit_hash }))))
        })
    }
}
