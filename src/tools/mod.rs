//! The Tool Registry: built-in tools the agent loop can invoke, each
//! modeled as an async generator of status events rather than a single
//! request/response call.

pub mod builtin;
pub mod registry;
pub mod traits;

use std::sync::Arc;

use crate::memory::MemoryAdapter;
use crate::sandbox::SandboxAdapter;

pub use builtin::{BashTool, GlobTool, GrepTool, LsTool, ReadTool, TodoReadTool, TodoWriteTool, UpdateTool, WriteTool};
pub use registry::ToolRegistry;
pub use traits::{run_tool, Tool, ToolEvent, ToolInfo};

/// Register the nine built-in tools (`read`, `write`, `update`, `ls`,
/// `glob`, `grep`, `bash`, `todoRead`, `todoWrite`) into `registry`.
pub fn register_builtin_tools(
    registry: &mut ToolRegistry,
    sandbox: Arc<dyn SandboxAdapter>,
    memory: Arc<dyn MemoryAdapter>,
) {
    registry.register(Arc::new(ReadTool::new(sandbox.clone())));
    registry.register(Arc::new(WriteTool::new(sandbox.clone())));
    registry.register(Arc::new(UpdateTool::new(sandbox.clone())));
    registry.register(Arc::new(LsTool::new(sandbox.clone())));
    registry.register(Arc::new(GlobTool::new(sandbox.clone())));
    registry.register(Arc::new(GrepTool::new(sandbox.clone())));
    registry.register(Arc::new(BashTool::new(sandbox)));
    registry.register(Arc::new(TodoReadTool::new(memory.clone())));
    registry.register(Arc::new(TodoWriteTool::new(memory)));
}
