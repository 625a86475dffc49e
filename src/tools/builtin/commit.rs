use std::sync::Arc;

use crate::sandbox::{GitOp, SandboxAdapter};

/// Derives the conventional-commits `<type>` for an auto-commit, in
/// priority order: exact operation match, then semantic keywords in the
/// description, then file type, then a `chore` default.
pub fn classify(operation: &str, description: &str, file_path: &str) -> &'static str {
    match operation {
        "created" => return "feat",
        "overwritten" | "edited" => return "chore",
        op if op.starts_with("executed:") => return "chore",
        _ => {}
    }

    let lower = description.to_lowercase();
    if lower.contains("fix") || lower.contains("bug") {
        return "fix";
    }
    if lower.contains("add") || lower.contains("new") {
        return "feat";
    }
    if lower.contains("remove") || lower.contains("delete") || lower.contains("update") || lower.contains("change") {
        return "chore";
    }

    let path_lower = file_path.to_lowercase();
    if path_lower.contains("test") || path_lower.ends_with(".spec.ts") || path_lower.ends_with(".spec.js") {
        return "test";
    }
    if path_lower.starts_with("readme") || path_lower.ends_with(".md") {
        return "docs";
    }
    if path_lower.ends_with(".css") || path_lower.ends_with(".scss") || path_lower.ends_with(".less") || path_lower.ends_with(".sass") {
        return "style";
    }

    "chore"
}

/// Runs the five-step auto-commit protocol. Any step failing after `add`
/// is a non-fatal warning: the caller still reports success, just without
/// a `commitHash`. A failure to configure git identity propagates.
pub async fn auto_commit(
    sandbox: &Arc<dyn SandboxAdapter>,
    paths: &[String],
    operation: &str,
    description: &str,
    scope: &str,
) -> Option<String> {
    sandbox.git(GitOp::Config { key: "user.name".to_string(), value: Some("agentstart".to_string()) }).await.ok()?;
    sandbox.git(GitOp::Config { key: "user.email".to_string(), value: Some("agent@agentstart.local".to_string()) }).await.ok()?;

    let add_paths = if paths.is_empty() { vec![".".to_string()] } else { paths.to_vec() };
    sandbox.git(GitOp::Add(add_paths)).await.ok()?;

    let commit_type = classify(operation, description, paths.first().map(String::as_str).unwrap_or(""));
    let message = format!("{commit_type}({scope}): {description}");
    let result = sandbox
        .git(GitOp::Commit { message, all: false })
        .await
        .ok()?;
    if !result.success {
        return None;
    }

    let _ = sandbox.git(GitOp::Push { remote: None, branch: None, force: false }).await;
    result.hash
}
