use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::sandbox::SandboxAdapter;

use super::super::traits::{Tool, ToolEvent, run_tool};

pub struct GlobTool {
    sandbox: Arc<dyn SandboxAdapter>,
}

impl GlobTool {
    pub fn new(sandbox: Arc<dyn SandboxAdapter>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for GlobTool {
    fn name(&self) -> &str {
        "glob"
    }

    fn description(&self) -> &str {
        "Find files matching one or more glob patterns, in deterministic lexicographic order."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": { "type": "string" },
                "patterns": { "type": "array", "items": { "type": "string" } },
                "cwd": { "type": "string" },
                "exclude": { "type": "array", "items": { "type": "string" } }
            }
        })
    }

    async fn execute(&self, _thread_id: &str, args: Value) -> mpsc::Receiver<ToolEvent> {
        let sandbox = self.sandbox.clone();
        let mut patterns: Vec<String> = args
            .get("patterns")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();
        if let Some(single) = args.get("pattern").and_then(Value::as_str) {
            patterns.push(single.to_string());
        }
        if patterns.is_empty() {
            return run_tool("matching files", || async { Err("missing required argument 'pattern' or 'patterns'".to_string()) });
        }
        let cwd = args.get("cwd").and_then(Value::as_str).map(str::to_string);
        let exclude: Vec<String> = args
            .get("exclude")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();

        run_tool("Matching files", move || async move {
            let mut matches = sandbox.glob(&patterns, cwd.as_deref()).await.map_err(|e| e.to_string())?;
            if !exclude.is_empty() {
                let mut builder = globset::GlobSetBuilder::new();
                for pat in &exclude {
                    if let Ok(glob) = globset::Glob::new(pat) {
                        builder.add(glob);
                    }
                }
                if let Ok(set) = builder.build() {
                    matches.retain(|m| !set.is_match(m));
                }
            }
            matches.sort();
            let output = matches.join("\n");
            Ok((output, Some(json!({ "count": matches.len() }))))
        })
    }
}
