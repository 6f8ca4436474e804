#![allow(dead_code)]

//! Test-only helpers shared by the scenario suite in [`scenarios`].

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use request_queue::{Cache, Entry, QueueResult};

/// An in-memory [`Cache`], standing in for a real disk/remote backend so the
/// scenario suite can assert on stored entries directly.
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> QueueResult<Option<Entry>> {
        Ok(self.entries.lock().expect("lock poisoned").get(key).cloned())
    }

    async fn put(&self, key: &str, entry: Entry) -> QueueResult<()> {
        self.entries.lock().expect("lock poisoned").insert(key.to_owned(), entry);
        Ok(())
    }

    async fn remove(&self, key: &str) -> QueueResult<()> {
        self.entries.lock().expect("lock poisoned").remove(key);
        Ok(())
    }

    async fn clear(&self) -> QueueResult<()> {
        self.entries.lock().expect("lock poisoned").clear();
        Ok(())
    }
}

#[cfg(test)]
mod scenarios;
