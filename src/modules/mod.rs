//! Container runtime detection and process plumbing, used by
//! [`crate::sandbox::ContainerSandbox`] to run `bash` calls inside an
//! isolated container instead of directly on the host.

#[cfg(feature = "containers")]
pub mod container;
