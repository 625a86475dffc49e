use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use tokio::{io::AsyncWriteExt, process::Command};

use super::traits::{GitOp, GitResult, Result};

/// Writes a throwaway askpass script that always fails, so a `git`
/// invocation never blocks on an interactive credential prompt. Combined
/// with `GIT_TERMINAL_PROMPT=0` this makes every git subcommand here
/// non-interactive by construction.
async fn write_askpass_script() -> Result<tempfile::TempPath> {
    let file = tempfile::NamedTempFile::new()?;
    let path = file.into_temp_path();
    let mut handle = tokio::fs::File::create(&path).await?;
    handle.write_all(b"#!/bin/sh\nexit 1\n").await?;
    #[cfg(unix)]
    {
        let mut perms = tokio::fs::metadata(&path).await?.permissions();
        perms.set_mode(0o700);
        tokio::fs::set_permissions(&path, perms).await?;
    }
    Ok(path)
}

async fn git(root: &Path, args: &[&str]) -> Result<GitResult> {
    let askpass = write_askpass_script().await?;
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("GIT_ASKPASS", askpass.to_path_buf())
        .output()
        .await?;

    Ok(GitResult {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        hash: None,
    })
}

/// Runs one [`GitOp`] against a worktree. Every subcommand is translated
/// verbatim to the equivalent `git` CLI invocation.
pub async fn run_git(root: &Path, op: GitOp) -> Result<GitResult> {
    match op {
        GitOp::Status => git(root, &["status", "--porcelain=v2", "--branch"]).await,
        GitOp::Add(paths) => {
            let mut args = vec!["add".to_string()];
            args.extend(paths);
            let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
            git(root, &args_ref).await
        }
        GitOp::Commit { message, all } => {
            let mut args = vec!["commit", "-m", &message];
            if all {
                args.insert(1, "-a");
            }
            let result = git(root, &args).await?;
            if result.success {
                let hash = git(root, &["rev-parse", "HEAD"]).await?;
                return Ok(GitResult { hash: Some(hash.stdout.trim().to_string()), ..result });
            }
            Ok(result)
        }
        GitOp::Push { remote, branch, force } => {
            let mut args = vec!["push".to_string()];
            if force {
                args.push("--force-with-lease".to_string());
            }
            if let Some(r) = remote {
                args.push(r);
            }
            if let Some(b) = branch {
                args.push(b);
            }
            let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
            git(root, &args_ref).await
        }
        GitOp::Pull { remote, branch } => {
            let mut args = vec!["pull".to_string()];
            args.extend(remote);
            args.extend(branch);
            let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
            git(root, &args_ref).await
        }
        GitOp::Fetch { remote } => {
            let mut args = vec!["fetch".to_string()];
            args.extend(remote);
            let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
            git(root, &args_ref).await
        }
        GitOp::Checkout { target, create } => {
            let mut args = vec!["checkout".to_string()];
            if create {
                args.push("-b".to_string());
            }
            args.push(target);
            let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
            git(root, &args_ref).await
        }
        GitOp::Branch { name } => match name {
            Some(name) => git(root, &["branch", &name]).await,
            None => git(root, &["branch", "--list"]).await,
        },
        GitOp::Merge { branch } => git(root, &["merge", "--no-edit", &branch]).await,
        GitOp::Rebase { onto } => git(root, &["rebase", &onto]).await,
        GitOp::Log { max_count } => {
            let count = max_count.unwrap_or(50).to_string();
            git(root, &["log", &format!("-{count}"), "--oneline"]).await
        }
        GitOp::Diff { staged, path } => {
            let mut args = vec!["diff".to_string()];
            if staged {
                args.push("--staged".to_string());
            }
            args.extend(path);
            let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
            git(root, &args_ref).await
        }
        GitOp::Stash { pop } => git(root, &["stash", if pop { "pop" } else { "push" }]).await,
        GitOp::Tag { name } => match name {
            Some(name) => git(root, &["tag", &name]).await,
            None => git(root, &["tag", "--list"]).await,
        },
        GitOp::Remote => git(root, &["remote", "-v"]).await,
        GitOp::Reset { target, hard } => {
            git(root, &["reset", if hard { "--hard" } else { "--mixed" }, &target]).await
        }
        GitOp::Revert { commit } => git(root, &["revert", "--no-edit", &commit]).await,
        GitOp::CherryPick { commit } => git(root, &["cherry-pick", &commit]).await,
        GitOp::Clean { force } => {
            git(root, &["clean", if force { "-fd" } else { "-nd" }]).await
        }
        GitOp::Config { key, value } => match value {
            Some(v) => git(root, &["config", &key, &v]).await,
            None => git(root, &["config", "--get", &key]).await,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn init_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        git(dir.path(), &["init"]).await.unwrap();
        git(dir.path(), &["config", "user.email", "a@example.com"]).await.unwrap();
        git(dir.path(), &["config", "user.name", "a"]).await.unwrap();
        dir
    }

    #[tokio::test]
    async fn status_on_fresh_repo_succeeds() {
        let dir = init_repo().await;
        let result = run_git(dir.path(), GitOp::Status).await.unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn commit_reports_the_new_hash() {
        let dir = init_repo().await;
        tokio::fs::write(dir.path().join("f.txt"), b"x").await.unwrap();
        run_git(dir.path(), GitOp::Add(vec!["f.txt".to_string()])).await.unwrap();
        let result = run_git(dir.path(), GitOp::Commit { message: "init".to_string(), all: false })
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.hash.is_some());
    }
}
