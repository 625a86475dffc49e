use std::{path::{Path, PathBuf}, process::Stdio, time::SystemTime};

use async_trait::async_trait;
use globset::{Glob, GlobSetBuilder};
use tokio::{fs, io::AsyncWriteExt, process::Command};

use super::{
    git::run_git,
    traits::{
        BashOptions, BashResult, EntryType, FsEntry, GitOp, GitResult, GrepMatch, GrepOptions,
        GrepResult, Result, SandboxAdapter, SandboxError,
    },
    DEFAULT_IGNORED_DIRS,
};

/// Subprocess-based [`SandboxAdapter`] that executes directly against a
/// workspace directory on the host running the runtime. All paths are
/// confined to `root`; anything that would resolve outside it is rejected.
pub struct LocalSandbox {
    root: PathBuf,
}

impl LocalSandbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let joined = if Path::new(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.root.join(path)
        };
        let normalized = normalize(&joined);
        if !normalized.starts_with(&self.root) {
            return Err(SandboxError::PathTraversal(path.to_string()));
        }
        Ok(normalized)
    }
}

/// Lexical `.`/`..` resolution without touching the filesystem, so this
/// works for paths that don't exist yet (e.g. a `write_file` target).
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                out.pop();
            }
            std::path::Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[async_trait]
impl SandboxAdapter for LocalSandbox {
    async fn readdir(&self, path: &str, recursive: bool, ignores: &[String]) -> Result<Vec<FsEntry>> {
        let root = self.resolve(path)?;
        let mut ignore_set = GlobSetBuilder::new();
        for pat in DEFAULT_IGNORED_DIRS.iter().map(|s| s.to_string()).chain(ignores.iter().cloned()) {
            if let Ok(glob) = Glob::new(&pat) {
                ignore_set.add(glob);
            }
        }
        let ignore_set = ignore_set.build().map_err(|e| SandboxError::Io(std::io::Error::other(e)))?;

        let cap = if recursive { 500 } else { 100 };
        let mut out = Vec::new();
        let mut stack = vec![root.clone()];
        while let Some(dir) = stack.pop() {
            let mut rd = fs::read_dir(&dir).await?;
            while let Some(entry) = rd.next_entry().await? {
                if out.len() >= cap {
                    break;
                }
                let name = entry.file_name().to_string_lossy().to_string();
                if ignore_set.is_match(&name) {
                    continue;
                }
                let meta = entry.metadata().await?;
                let entry_type = if meta.is_dir() {
                    EntryType::Dir
                } else if meta.file_type().is_symlink() {
                    EntryType::Symlink
                } else {
                    EntryType::File
                };
                let rel = entry.path().strip_prefix(&self.root).unwrap_or(&entry.path()).to_string_lossy().to_string();
                if recursive && entry_type == EntryType::Dir {
                    stack.push(entry.path());
                }
                out.push(FsEntry {
                    name,
                    path: rel,
                    entry_type,
                    size: meta.len(),
                    modified_at: meta.modified().ok(),
                });
            }
        }
        out.truncate(cap);
        Ok(out)
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let resolved = self.resolve(path)?;
        fs::read(&resolved).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SandboxError::NotFound(path.to_string())
            } else {
                SandboxError::Io(e)
            }
        })
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let resolved = self.resolve(path)?;
        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = fs::File::create(&resolved).await?;
        file.write_all(data).await?;
        Ok(())
    }

    async fn mkdir(&self, path: &str) -> Result<()> {
        let resolved = self.resolve(path)?;
        fs::create_dir_all(&resolved).await?;
        Ok(())
    }

    async fn rm(&self, path: &str, recursive: bool) -> Result<()> {
        let resolved = self.resolve(path)?;
        let meta = fs::metadata(&resolved).await?;
        if meta.is_dir() {
            if recursive {
                fs::remove_dir_all(&resolved).await?;
            } else {
                fs::remove_dir(&resolved).await?;
            }
        } else {
            fs::remove_file(&resolved).await?;
        }
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from = self.resolve(from)?;
        let to = self.resolve(to)?;
        fs::rename(&from, &to).await?;
        Ok(())
    }

    async fn stat(&self, path: &str) -> Result<FsEntry> {
        let resolved = self.resolve(path)?;
        let meta = fs::metadata(&resolved).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SandboxError::NotFound(path.to_string())
            } else {
                SandboxError::Io(e)
            }
        })?;
        let entry_type = if meta.is_dir() {
            EntryType::Dir
        } else if meta.file_type().is_symlink() {
            EntryType::Symlink
        } else {
            EntryType::File
        };
        Ok(FsEntry {
            name: resolved.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default(),
            path: path.to_string(),
            entry_type,
            size: meta.len(),
            modified_at: meta.modified().ok(),
        })
    }

    async fn exists(&self, path: &str) -> bool {
        match self.resolve(path) {
            Ok(resolved) => fs::metadata(&resolved).await.is_ok(),
            Err(_) => false,
        }
    }

    async fn glob(&self, patterns: &[String], cwd: Option<&str>) -> Result<Vec<String>> {
        let base = match cwd {
            Some(c) => self.resolve(c)?,
            None => self.root.clone(),
        };
        let mut builder = ignore::WalkBuilder::new(&base);
        builder.standard_filters(true);
        builder.filter_entry(|entry| {
            !DEFAULT_IGNORED_DIRS
                .iter()
                .any(|ignored| entry.file_name().to_str() == Some(ignored))
        });
        let mut set = GlobSetBuilder::new();
        for pat in patterns {
            if let Ok(glob) = Glob::new(pat) {
                set.add(glob);
            }
        }
        let set = set.build().map_err(|e| SandboxError::Io(std::io::Error::other(e)))?;

        let mut out = Vec::new();
        for entry in builder.build().flatten() {
            let path = entry.path();
            let rel = path.strip_prefix(&base).unwrap_or(path);
            if set.is_match(rel) {
                out.push(path.strip_prefix(&self.root).unwrap_or(path).to_string_lossy().to_string());
            }
        }
        Ok(out)
    }

    async fn bash(&self, command: &str, opts: BashOptions) -> Result<BashResult> {
        let timeout_ms = opts.timeout_ms.clamp(0, 600_000).max(1);
        let cwd = match &opts.cwd {
            Some(c) => self.resolve(c)?,
            None => self.root.clone(),
        };
        let mut cmd = Command::new("bash");
        cmd.arg("-c")
            .arg(command)
            .current_dir(&cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (k, v) in &opts.env {
            cmd.env(k, v);
        }
        let child = cmd.spawn()?;
        let fut = child.wait_with_output();
        match tokio::time::timeout(std::time::Duration::from_millis(timeout_ms), fut).await {
            Ok(output) => {
                let output = output?;
                Ok(BashResult {
                    stdout: truncate(&String::from_utf8_lossy(&output.stdout)),
                    stderr: truncate(&String::from_utf8_lossy(&output.stderr)),
                    exit_code: output.status.code().unwrap_or(-1),
                    timed_out: false,
                })
            }
            Err(_) => Ok(BashResult {
                stdout: String::new(),
                stderr: String::new(),
                exit_code: -1,
                timed_out: true,
            }),
        }
    }

    async fn grep(&self, pattern: &str, opts: GrepOptions) -> Result<GrepResult> {
        let base = match &opts.path {
            Some(p) => self.resolve(p)?,
            None => self.root.clone(),
        };
        let mut args = vec!["--vimgrep".to_string(), "--no-heading".to_string()];
        if opts.case_insensitive {
            args.push("-i".to_string());
        }
        if let Some(glob) = &opts.glob {
            args.push("--glob".to_string());
            args.push(glob.clone());
        }
        args.push(pattern.to_string());
        let output = Command::new("rg")
            .args(&args)
            .current_dir(&base)
            .output()
            .await?;

        let text = String::from_utf8_lossy(&output.stdout);
        let mut matches = Vec::new();
        for line in text.lines() {
            // rg --vimgrep: path:line:col:text
            let mut parts = line.splitn(4, ':');
            if let (Some(path), Some(line_no), Some(_col), Some(text)) =
                (parts.next(), parts.next(), parts.next(), parts.next())
            {
                if let Ok(line_no) = line_no.parse::<u64>() {
                    matches.push(GrepMatch { path: path.to_string(), line: line_no, text: text.to_string() });
                }
            }
            if matches.len() >= 500 {
                break;
            }
        }
        let truncated = matches.len() >= 500;
        Ok(GrepResult { matches, truncated })
    }

    async fn git(&self, op: GitOp) -> Result<GitResult> {
        run_git(&self.root, op).await
    }
}

fn truncate(s: &str) -> String {
    const CAP: usize = 30_000;
    if s.len() <= CAP {
        s.to_string()
    } else {
        format!("{}\n... [truncated]", &s[..CAP])
    }
}

#[allow(dead_code)]
fn file_modified(meta: &std::fs::Metadata) -> Option<SystemTime> {
    meta.modified().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn sandbox() -> (LocalSandbox, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (LocalSandbox::new(dir.path()), dir)
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let (sb, _dir) = sandbox().await;
        sb.write_file("a.txt", b"hello").await.unwrap();
        assert_eq!(sb.read_file("a.txt").await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn path_traversal_is_rejected() {
        let (sb, _dir) = sandbox().await;
        let err = sb.read_file("../../etc/passwd").await.unwrap_err();
        assert!(matches!(err, SandboxError::PathTraversal(_)));
    }

    #[tokio::test]
    async fn rm_recursive_removes_directory() {
        let (sb, _dir) = sandbox().await;
        sb.mkdir("nested/dir").await.unwrap();
        sb.write_file("nested/dir/f.txt", b"x").await.unwrap();
        sb.rm("nested", true).await.unwrap();
        assert!(!sb.exists("nested").await);
    }

    #[tokio::test]
    async fn exists_is_false_for_missing_path() {
        let (sb, _dir) = sandbox().await;
        assert!(!sb.exists("nope.txt").await);
    }
}
