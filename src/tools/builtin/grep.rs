use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::sandbox::{GrepOptions, SandboxAdapter};

use super::super::traits::{Tool, ToolEvent, run_tool};

pub struct GrepTool {
    sandbox: Arc<dyn SandboxAdapter>,
}

impl GrepTool {
    pub fn new(sandbox: Arc<dyn SandboxAdapter>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for GrepTool {
    fn name(&self) -> &str {
        "grep"
    }

    fn description(&self) -> &str {
        "Search file contents for a pattern, delegating to the sandbox's shell grep."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": { "type": "string" },
                "path": { "type": "string" },
                "include": { "type": "string" },
                "exclude": { "type": "string" },
                "ignoreCase": { "type": "boolean" },
                "maxResults": { "type": "integer" }
            },
            "required": ["pattern"]
        })
    }

    async fn execute(&self, _thread_id: &str, args: Value) -> mpsc::Receiver<ToolEvent> {
        let sandbox = self.sandbox.clone();
        let Some(pattern) = args.get("pattern").and_then(Value::as_str).map(str::to_string) else {
            return run_tool("searching", || async { Err("missing required argument 'pattern'".to_string()) });
        };
        let opts = GrepOptions {
            path: args.get("path").and_then(Value::as_str).map(str::to_string),
            glob: args.get("include").and_then(Value::as_str).map(str::to_string),
            case_insensitive: args.get("ignoreCase").and_then(Value::as_bool).unwrap_or(false),
        };
        let max_results = args.get("maxResults").and_then(Value::as_u64).map(|n| n as usize);

        run_tool(format!("Searching for {pattern}"), move || async move {
            let mut result = sandbox.grep(&pattern, opts).await.map_err(|e| e.to_string())?;
            if let Some(max) = max_results {
                result.matches.truncate(max);
            }
            let output = result
                .matches
                .iter()
                .map(|m| format!("{}:{}: {}", m.path, m.line, m.text))
                .collect::<Vec<_>>()
                .join("\n");
            Ok((output, Some(json!({ "count": result.matches.len(), "truncated": result.truncated }))))
        })
    }
}
