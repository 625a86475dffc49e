//! The secondary key-value store backing the sandbox lease protocol:
//! `SET key value PX ttl` / `DEL key`, the minimal surface any Redis-like
//! or library-provided store needs to expose.

pub mod in_memory;
pub mod sqlite;

use async_trait::async_trait;
use std::time::Duration;

pub use in_memory::InMemoryKv;
pub use sqlite::SqliteKv;

#[async_trait]
pub trait KvStore: Send + Sync {
    /// `SET key value PX ttl`.
    async fn set_px(&self, key: &str, value: &str, ttl: Duration);
    /// Returns `None` if the key is absent or has expired.
    async fn get(&self, key: &str) -> Option<String>;
    /// `DEL key`.
    async fn del(&self, key: &str);
}
