//! The Thread Stream Coordinator: the public `thread.stream` entry point
//! tying the memory adapter, sandbox lease, tool registry, and agent loop
//! together into one UI event stream per turn.

pub mod coordinator;

pub use coordinator::{
    CoordinatorError, SuggestionsConfig, ThreadCoordinator, ThreadCoordinatorConfig, ThreadStreamRequest,
    TitleGenConfig,
};
