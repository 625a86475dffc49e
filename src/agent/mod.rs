//! The Agent Loop: the tool-loop scheduler that drives one user turn to
//! completion, streaming [`event::UiEvent`]s as it goes.

pub mod event;
pub mod loop_;

pub use event::UiEvent;
pub use loop_::{
    step_count_is, AgentLoop, AgentLoopConfig, AgentLoopError, LoopOutcome, StopPredicate,
    ToolDispatchPolicy,
};
