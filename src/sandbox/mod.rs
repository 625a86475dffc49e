//! The Sandbox Adapter & Lease Manager: one remote execution environment
//! per agent thread, exposing `fs`, `shell`, and `git`, governed by a
//! lease stored in a shared KV.

#[cfg(feature = "containers")]
pub mod container;
pub mod git;
pub mod lease;
pub mod local;
pub mod traits;

#[cfg(feature = "containers")]
pub use container::ContainerSandbox;
pub use lease::{LeaseManager, LeasedSandbox, SandboxStatus};
pub use local::LocalSandbox;
pub use traits::{
    BashOptions, BashResult, EntryType, FsEntry, GitOp, GitResult, GrepMatch, GrepOptions,
    GrepResult, SandboxAdapter, SandboxError,
};

/// Fixed set of directories merged with any user-supplied ignores for
/// `readdir`/`glob`.
pub const DEFAULT_IGNORED_DIRS: &[&str] = &["node_modules", ".git", "dist", "build", "target", ".next"];

/// Heartbeat key format for the lease protocol.
pub fn heartbeat_key(sandbox_id: &str) -> String {
    format!("sandbox:heartbeat:{sandbox_id}")
}
