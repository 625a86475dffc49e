use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::sandbox::SandboxAdapter;

use super::super::traits::{Tool, ToolEvent, run_tool};

const DEFAULT_LIMIT: usize = 2000;
const MAX_LINE_LEN: usize = 2000;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "ico", "svg"];
const BINARY_EXTENSIONS: &[&str] = &["zip", "tar", "gz", "exe", "so", "dylib", "dll", "bin", "pdf", "woff", "woff2"];

/// Null byte in the first 4096 bytes, or more than 30% non-printable
/// bytes, means the content is binary and must not be read as text.
pub fn looks_binary(data: &[u8]) -> bool {
    let sample = &data[..data.len().min(4096)];
    if sample.contains(&0) {
        return true;
    }
    if sample.is_empty() {
        return false;
    }
    let non_printable = sample
        .iter()
        .filter(|&&b| b < 0x09 || (b > 0x0d && b < 0x20))
        .count();
    (non_printable as f64 / sample.len() as f64) > 0.30
}

fn extension_of(path: &str) -> String {
    path.rsplit('.').next().unwrap_or("").to_lowercase()
}

pub struct ReadTool {
    sandbox: Arc<dyn SandboxAdapter>,
}

impl ReadTool {
    pub fn new(sandbox: Arc<dyn SandboxAdapter>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for ReadTool {
    fn name(&self) -> &str {
        "read"
    }

    fn description(&self) -> &str {
        "Read a file's contents from the sandbox workspace, with line numbers."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filePath": { "type": "string" },
                "offset": { "type": "integer", "minimum": 0 },
                "limit": { "type": "integer", "minimum": 1 }
            },
            "required": ["filePath"]
        })
    }

    async fn execute(&self, _thread_id: &str, args: Value) -> mpsc::Receiver<ToolEvent> {
        let sandbox = self.sandbox.clone();
        let Some(path) = args.get("filePath").and_then(Value::as_str).map(str::to_string) else {
            return run_tool("reading file", || async { Err("missing required argument 'filePath'".to_string()) });
        };
        let offset = args.get("offset").and_then(Value::as_u64).unwrap_or(0) as usize;
        let limit = args.get("limit").and_then(Value::as_u64).map(|n| n as usize).unwrap_or(DEFAULT_LIMIT);

        run_tool(format!("Reading {path}"), move || async move {
            if !path.starts_with('/') {
                return Err(format!("'{path}' is not an absolute path"));
            }
            let ext = extension_of(&path);
            if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
                return Err(format!("'{path}' is an image file and cannot be read as text"));
            }
            if BINARY_EXTENSIONS.contains(&ext.as_str()) {
                return Err(format!("'{path}' has a known binary extension"));
            }

            let bytes = sandbox.read_file(&path).await.map_err(|e| e.to_string())?;
            if looks_binary(&bytes) {
                return Err(format!("'{path}' appears to be binary and cannot be read as text"));
            }

            let text = String::from_utf8_lossy(&bytes);
            let lines: Vec<&str> = text.lines().collect();
            let mut out = String::new();
            for (i, line) in lines.iter().enumerate().skip(offset).take(limit) {
                let line_no = i + 1;
                let truncated: String = if line.len() > MAX_LINE_LEN {
                    format!("{}... [truncated]", &line[..MAX_LINE_LEN])
                } else {
                    line.to_string()
                };
                out.push_str(&format!("{line_no:05}| {truncated}\n"));
            }
            Ok((out, Some(json!({ "path": path, "lineCount": lines.len() }))))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_byte_in_first_4096_bytes_is_binary() {
        let mut data = vec![b'a'; 100];
        data[50] = 0;
        assert!(looks_binary(&data));
    }

    #[test]
    fn mostly_text_is_not_binary() {
        let data = b"the quick brown fox jumps over the lazy dog\n".repeat(20);
        assert!(!looks_binary(&data));
    }

    #[test]
    fn high_non_printable_ratio_is_binary() {
        let data: Vec<u8> = (0u8..=40).collect();
        assert!(looks_binary(&data));
    }

    #[test]
    fn empty_content_is_not_binary() {
        assert!(!looks_binary(&[]));
    }
}
