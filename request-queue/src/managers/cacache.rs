use async_trait::async_trait;

use crate::cache::{Cache, Entry};
use crate::error::QueueResult;

/// A disk-backed [`Cache`] built on [`cacache`](https://github.com/zkat/cacache-rs),
/// the default manager for this crate (feature `manager-cacache`, on by default).
#[derive(Debug, Clone)]
pub struct CaCacheManager {
    /// Directory the cache is stored under.
    pub path: String,
}

impl Default for CaCacheManager {
    fn default() -> Self {
        CaCacheManager { path: "./request-cacache".into() }
    }
}

impl CaCacheManager {
    /// Use a specific cache directory instead of the default `./request-cacache`.
    pub fn new(path: impl Into<String>) -> Self {
        CaCacheManager { path: path.into() }
    }
}

#[async_trait]
impl Cache for CaCacheManager {
    async fn get(&self, key: &str) -> QueueResult<Option<Entry>> {
        match ::cacache::read(&self.path, key).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(::cacache::Error::EntryNotFound(..)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn put(&self, key: &str, entry: Entry) -> QueueResult<()> {
        let bytes = serde_json::to_vec(&entry)?;
        ::cacache::write(&self.path, key, bytes).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> QueueResult<()> {
        ::cacache::remove(&self.path, key).await?;
        Ok(())
    }

    async fn clear(&self) -> QueueResult<()> {
        ::cacache::clear(&self.path).await?;
        Ok(())
    }
}
