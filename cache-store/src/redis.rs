use crate::error::{CacheError, Result};
use crate::CodeCache;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

/// Redis cache backend over a managed (auto-reconnecting) connection.
pub struct RedisCodeCache {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisCodeCache {
    pub async fn connect(url: &str, prefix: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            prefix: prefix.to_string(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl CodeCache for RedisCodeCache {
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        // SET EX wants whole seconds; never pass zero or the key persists
        let seconds = ttl.as_secs().max(1) as u64;
        let _: () = conn.set_ex(self.key(key), value, seconds).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(self.key(key)).await?;
        value.ok_or(CacheError::NotFound)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(self.key(key)).await?;
        Ok(())
    }
}
