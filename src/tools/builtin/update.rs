use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::sandbox::SandboxAdapter;

use super::super::traits::{Tool, ToolEvent, run_tool};
use super::commit::auto_commit;

pub struct UpdateTool {
    sandbox: Arc<dyn SandboxAdapter>,
}

impl UpdateTool {
    pub fn new(sandbox: Arc<dyn SandboxAdapter>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for UpdateTool {
    fn name(&self) -> &str {
        "update"
    }

    fn description(&self) -> &str {
        "Replace an exact string occurrence in a file. An empty oldString creates a new file."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filePath": { "type": "string" },
                "oldString": { "type": "string" },
                "newString": { "type": "string" },
                "replaceAll": { "type": "boolean" }
            },
            "required": ["filePath", "oldString", "newString"]
        })
    }

    async fn execute(&self, _thread_id: &str, args: Value) -> mpsc::Receiver<ToolEvent> {
        let sandbox = self.sandbox.clone();
        let Some(path) = args.get("filePath").and_then(Value::as_str).map(str::to_string) else {
            return run_tool("updating file", || async { Err("missing required argument 'filePath'".to_string()) });
        };
        let old_string = args.get("oldString").and_then(Value::as_str).unwrap_or("").to_string();
        let Some(new_string) = args.get("newString").and_then(Value::as_str).map(str::to_string) else {
            return run_tool("updating file", || async { Err("missing required argument 'newString'".to_string()) });
        };
        let replace_all = args.get("replaceAll").and_then(Value::as_bool).unwrap_or(false);

        run_tool(format!("Updating {path}"), move || async move {
            if old_string == new_string {
                return Err("oldString and newString are identical".to_string());
            }

            if old_string.is_empty() {
                sandbox.write_file(&path, new_string.as_bytes()).await.map_err(|e| e.to_string())?;
                let hash = auto_commit(&sandbox, &[path.clone()], "created", &format!("created {path}"), "files").await;
                return Ok((format!("Created {path}"), Some(json!({ "path": path, "commitHash": hash }))));
            }

            let bytes = sandbox.read_file(&path).await.map_err(|e| e.to_string())?;
            let content = String::from_utf8_lossy(&bytes).into_owned();
            let count = content.matches(&old_string).count();
            if count == 0 {
                return Err(format!("oldString not found in {path}"));
            }
            if count > 1 && !replace_all {
                return Err(format!(
                    "oldString matches {count} locations in {path}; pass replaceAll to replace them all"
                ));
            }

            let updated = if replace_all {
                content.replace(&old_string, &new_string)
            } else {
                content.replacen(&old_string, &new_string, 1)
            };
            sandbox.write_file(&path, updated.as_bytes()).await.map_err(|e| e.to_string())?;
            let hash = auto_commit(&sandbox, &[path.clone()], "edited", &format!("edited {path}"), "files").await;
            Ok((format!("Updated {path}"), Some(json!({ "path": path, "replacements": count, "commitHash": hash }))))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::LocalSandbox;

    async fn tool() -> (UpdateTool, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let sandbox: Arc<dyn SandboxAdapter> = Arc::new(LocalSandbox::new(dir.path()));
        (UpdateTool::new(sandbox), dir)
    }

    #[tokio::test]
    async fn empty_old_string_creates_file() {
        let (tool, dir) = tool().await;
        let path = dir.path().join("new.txt").to_string_lossy().into_owned();
        let mut rx = tool
            .execute("t1", json!({ "filePath": path, "oldString": "", "newString": "hello" }))
            .await;
        while let Some(event) = rx.recv().await {
            if event.is_terminal() {
                assert!(matches!(event, ToolEvent::Done { .. }));
            }
        }
    }

    #[tokio::test]
    async fn ambiguous_match_without_replace_all_fails() {
        let (tool, dir) = tool().await;
        let path = dir.path().join("dup.txt");
        tokio::fs::write(&path, "x x x").await.unwrap();
        let path = path.to_string_lossy().into_owned();
        let mut rx = tool
            .execute("t1", json!({ "filePath": path, "oldString": "x", "newString": "y" }))
            .await;
        let mut saw_error = false;
        while let Some(event) = rx.recv().await {
            if let ToolEvent::Error { message, .. } = &event {
                assert!(message.contains('3'));
                saw_error = true;
            }
        }
        assert!(saw_error);
    }
}
