use std::{path::PathBuf, sync::Arc};

use crate::{config::AppConfig, memory::MemoryAdapter, thread::ThreadCoordinator};

/// Shared axum state: the coordinator every procedure dispatches through,
/// the memory adapter for the simpler read-only procedures, and the loaded
/// config snapshot `config.get` returns verbatim.
#[derive(Clone)]
pub struct AppState {
    pub memory: Arc<dyn MemoryAdapter>,
    pub coordinator: Arc<ThreadCoordinator>,
    pub config: Arc<AppConfig>,
    /// Same root the coordinator mints per-thread sandbox directories under;
    /// kept alongside it so `sandbox.list` can open a thread's sandbox
    /// directly without a method added to `ThreadCoordinator` just for this.
    pub workspace_root: PathBuf,
}

pub type GatewayState = AppState;
