//! Expiring key-value cache for Gatehouse Engine
//!
//! Backs the one-time registration and password-reset codes with a small
//! set/get/delete surface and per-entry TTLs. Policy data never lives
//! here. Backends: in-process memory (default) and Redis.
//!
//! The check-then-delete sequence around code consumption is deliberately
//! not atomic against a racing duplicate submission; consumption is
//! best-effort at-least-once.

pub mod error;
pub mod memory;
pub mod redis;

pub use error::*;
pub use memory::*;
pub use redis::*;

use async_trait::async_trait;
use std::time::Duration;

/// Expiring key-value store used for one-time codes.
#[async_trait]
pub trait CodeCache: Send + Sync {
    /// Store `value` under `key` for `ttl`, replacing any previous entry.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// Fetch a live entry. Expired and absent keys are both
    /// [`CacheError::NotFound`].
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Drop an entry. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;
}
