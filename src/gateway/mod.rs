#[cfg(feature = "gateway")]
pub mod auth;
#[cfg(feature = "gateway")]
pub mod daemon;
#[cfg(feature = "gateway")]
pub mod error;
#[cfg(feature = "gateway")]
pub mod rpc;
#[cfg(feature = "gateway")]
pub mod state;
#[cfg(feature = "gateway")]
pub mod ws;

#[cfg(feature = "gateway")]
pub use daemon::start_gateway;
#[cfg(feature = "gateway")]
pub use error::ApiError;
#[cfg(feature = "gateway")]
pub use state::{AppState, GatewayState};
