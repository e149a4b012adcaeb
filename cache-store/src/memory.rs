use crate::error::{CacheError, Result};
use crate::CodeCache;
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// In-process cache backend.
///
/// Entries expire lazily on read; writes opportunistically sweep dead
/// entries so an idle key set cannot grow without bound.
#[derive(Default)]
pub struct MemoryCodeCache {
    entries: DashMap<String, Entry>,
}

struct Entry {
    value: Vec<u8>,
    deadline: Instant,
}

impl MemoryCodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn sweep(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.deadline > now);
    }
}

#[async_trait]
impl CodeCache for MemoryCodeCache {
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        self.sweep();
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                deadline: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        if let Some(entry) = self.entries.get(key) {
            if entry.deadline > Instant::now() {
                return Ok(entry.value.clone());
            }
        }
        // either absent or dead; drop a dead entry on the way out
        self.entries
            .remove_if(key, |_, entry| entry.deadline <= Instant::now());
        Err(CacheError::NotFound)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
