use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::Connection;

use super::KvStore;

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// `rusqlite`-backed KV store sharing the connection used by
/// [`crate::memory::SqliteMemoryAdapter`] — any store supporting `SET key
/// value PX ttl` and `DEL` satisfies the [`KvStore`] contract.
pub struct SqliteKv {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKv {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl KvStore for SqliteKv {
    async fn set_px(&self, key: &str, value: &str, ttl: Duration) {
        let expires_at = now_millis() + ttl.as_millis() as i64;
        let conn = self.conn.lock();
        let _ = conn.execute(
            "INSERT INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
            rusqlite::params![key, value, expires_at],
        );
    }

    async fn get(&self, key: &str) -> Option<String> {
        let conn = self.conn.lock();
        let row: Option<(String, i64)> = conn
            .query_row("SELECT value, expires_at FROM kv WHERE key = ?1", [key], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .ok();
        match row {
            Some((value, expires_at)) if expires_at > now_millis() => Some(value),
            Some(_) => {
                let _ = conn.execute("DELETE FROM kv WHERE key = ?1", [key]);
                None
            }
            None => None,
        }
    }

    async fn del(&self, key: &str) {
        let conn = self.conn.lock();
        let _ = conn.execute("DELETE FROM kv WHERE key = ?1", [key]);
    }
}
