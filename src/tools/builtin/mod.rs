//! The nine built-in tools and the auto-commit side effect they share.

pub mod bash;
pub mod commit;
pub mod glob;
pub mod grep;
pub mod ls;
pub mod read;
pub mod todo;
pub mod update;
pub mod write;

pub use bash::BashTool;
pub use glob::GlobTool;
pub use grep::GrepTool;
pub use ls::LsTool;
pub use read::ReadTool;
pub use todo::{TodoReadTool, TodoWriteTool};
pub use update::UpdateTool;
pub use write::WriteTool;
