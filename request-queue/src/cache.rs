use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::QueueResult;

/// A cached response plus the TTL/validation metadata needed to triage it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// The raw, previously-received response body.
    pub data: Vec<u8>,
    /// The response headers as they were received.
    pub headers: HashMap<String, String>,
    /// The server's `ETag`, if any, for `If-None-Match` revalidation.
    pub etag: Option<String>,
    /// The server's `Date` header at the time this entry was stored, in epoch millis.
    pub server_date: u64,
    /// Hard expiry: once elapsed, this entry must not be served even speculatively.
    pub ttl: u64,
    /// Soft expiry: once elapsed (but before `ttl`), this entry may still be served
    /// while a background refresh is kicked off.
    pub soft_ttl: u64,
}

impl Entry {
    /// Build an entry with the given body/headers and hard/soft TTLs measured in
    /// milliseconds from now.
    pub fn new(
        data: Vec<u8>,
        headers: HashMap<String, String>,
        ttl_ms: u64,
        soft_ttl_ms: u64,
    ) -> Self {
        let now = now_millis();
        Entry {
            data,
            headers,
            etag: None,
            server_date: now,
            ttl: now + ttl_ms,
            soft_ttl: now + soft_ttl_ms,
        }
    }

    /// Attach a server `ETag` for conditional revalidation.
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Past the hard TTL: this entry must be refetched, not served even as a preview.
    pub fn is_expired(&self) -> bool {
        now_millis() >= self.ttl
    }

    /// Past the soft TTL (but not the hard one): usable, but a background refresh
    /// should be kicked off.
    pub fn refresh_needed(&self) -> bool {
        now_millis() >= self.soft_ttl
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_millis() as u64
}

/// A keyed byte store with TTL and soft-expiry metadata.
///
/// Implementations must be safe for concurrent `get`/`put`/`remove`; this crate's
/// dispatchers call these methods from multiple tasks without external synchronization.
#[async_trait]
pub trait Cache: Send + Sync + 'static {
    /// Perform any one-time, potentially blocking setup (e.g. opening a disk index).
    /// Called once by the cache dispatcher before it starts taking requests.
    async fn initialize(&self) -> QueueResult<()> {
        Ok(())
    }

    /// Look up the entry for `key`, if any.
    async fn get(&self, key: &str) -> QueueResult<Option<Entry>>;

    /// Store `entry` under `key`, replacing any existing entry.
    async fn put(&self, key: &str, entry: Entry) -> QueueResult<()>;

    /// Invalidate the entry for `key`. If `full_expire` is `true` the entry is
    /// removed outright; otherwise its hard TTL is forced into the past so it is
    /// still available for a stale read but never served as fresh.
    async fn invalidate(&self, key: &str, full_expire: bool) -> QueueResult<()> {
        if full_expire {
            self.remove(key).await
        } else if let Some(mut entry) = self.get(key).await? {
            entry.ttl = 0;
            entry.soft_ttl = 0;
            self.put(key, entry).await
        } else {
            Ok(())
        }
    }

    /// Remove the entry for `key` outright.
    async fn remove(&self, key: &str) -> QueueResult<()>;

    /// Remove every entry.
    async fn clear(&self) -> QueueResult<()>;
}
