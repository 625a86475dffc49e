use std::{collections::HashMap, time::{Duration, Instant}};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::KvStore;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process fake KV store, used by tests and by the gateway's
/// `--ephemeral` mode alongside [`crate::memory::InMemoryAdapter`].
#[derive(Default)]
pub struct InMemoryKv {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for InMemoryKv {
    async fn set_px(&self, key: &str, value: &str, ttl: Duration) {
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    async fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(e) if e.expires_at > Instant::now() => Some(e.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn del(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let kv = InMemoryKv::new();
        kv.set_px("sandbox:heartbeat:abc", "123", Duration::from_secs(60)).await;
        assert_eq!(kv.get("sandbox:heartbeat:abc").await, Some("123".to_string()));
    }

    #[tokio::test]
    async fn expired_key_reads_as_absent() {
        let kv = InMemoryKv::new();
        kv.set_px("k", "v", Duration::from_millis(1)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(kv.get("k").await, None);
    }

    #[tokio::test]
    async fn del_removes_key() {
        let kv = InMemoryKv::new();
        kv.set_px("k", "v", Duration::from_secs(60)).await;
        kv.del("k").await;
        assert_eq!(kv.get("k").await, None);
    }
}
