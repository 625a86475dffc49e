use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::sandbox::{EntryType, SandboxAdapter};

use super::super::traits::{Tool, ToolEvent, run_tool};

pub struct LsTool {
    sandbox: Arc<dyn SandboxAdapter>,
}

impl LsTool {
    pub fn new(sandbox: Arc<dyn SandboxAdapter>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for LsTool {
    fn name(&self) -> &str {
        "ls"
    }

    fn description(&self) -> &str {
        "List directory entries, directories first then alphabetically."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "recursive": { "type": "boolean" },
                "ignore": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, _thread_id: &str, args: Value) -> mpsc::Receiver<ToolEvent> {
        let sandbox = self.sandbox.clone();
        let path = args.get("path").and_then(Value::as_str).unwrap_or(".").to_string();
        let recursive = args.get("recursive").and_then(Value::as_bool).unwrap_or(false);
        let ignore: Vec<String> = args
            .get("ignore")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();

        run_tool(format!("Listing {path}"), move || async move {
            let mut entries = sandbox.readdir(&path, recursive, &ignore).await.map_err(|e| e.to_string())?;
            entries.sort_by(|a, b| match (a.entry_type, b.entry_type) {
                (EntryType::Dir, EntryType::Dir) | (EntryType::File, EntryType::File) | (EntryType::Symlink, EntryType::Symlink) => a.name.cmp(&b.name),
                (EntryType::Dir, _) => std::cmp::Ordering::Less,
                (_, EntryType::Dir) => std::cmp::Ordering::Greater,
                _ => a.name.cmp(&b.name),
            });

            let listing = entries
                .iter()
                .map(|e| format!("{} {}", if e.entry_type == EntryType::Dir { "d" } else { "f" }, e.path))
                .collect::<Vec<_>>()
                .join("\n");
            let metadata = json!({ "entries": entries.iter().map(|e| json!({
                "name": e.name,
                "path": e.path,
                "type": e.entry_type,
                "size": e.size,
            })).collect::<Vec<_>>() });
            Ok((listing, Some(metadata)))
        })
    }
}
