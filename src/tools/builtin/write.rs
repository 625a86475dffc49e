use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::sandbox::SandboxAdapter;

use super::super::traits::{Tool, ToolEvent, run_tool};
use super::commit::auto_commit;

pub struct WriteTool {
    sandbox: Arc<dyn SandboxAdapter>,
}

impl WriteTool {
    pub fn new(sandbox: Arc<dyn SandboxAdapter>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for WriteTool {
    fn name(&self) -> &str {
        "write"
    }

    fn description(&self) -> &str {
        "Write content to an absolute file path, creating parent directories and the file if needed."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filePath": { "type": "string" },
                "content": { "type": "string" }
            },
            "required": ["filePath", "content"]
        })
    }

    async fn execute(&self, _thread_id: &str, args: Value) -> mpsc::Receiver<ToolEvent> {
        let sandbox = self.sandbox.clone();
        let Some(path) = args.get("filePath").and_then(Value::as_str).map(str::to_string) else {
            return run_tool("writing file", || async { Err("missing required argument 'filePath'".to_string()) });
        };
        let Some(content) = args.get("content").and_then(Value::as_str).map(str::to_string) else {
            return run_tool("writing file", || async { Err("missing required argument 'content'".to_string()) });
        };

        run_tool(format!("Writing {path}"), move || async move {
            if !path.starts_with('/') {
                return Err(format!("'{path}' is not an absolute path"));
            }
            let existed = sandbox.exists(&path).await;
            sandbox.write_file(&path, content.as_bytes()).await.map_err(|e| e.to_string())?;

            let operation = if existed { "overwritten" } else { "created" };
            let hash = auto_commit(&sandbox, &[path.clone()], operation, &format!("{operation} {path}"), "files").await;

            Ok((format!("Wrote {} bytes to {path}", content.len()), Some(json!({ "path": path, "commitHash": hash }))))
        })
    }
}
