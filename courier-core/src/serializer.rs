// ABOUTME: Per-key mutual exclusion for async work.
// ABOUTME: Work for one key runs strictly one at a time; different keys never wait on each other.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

type KeyLock = Arc<tokio::sync::Mutex<()>>;

/// Runs async work under a lock chosen by key.
///
/// Locks are created on first use of a key and dropped from the table once
/// nobody holds or waits on them, so the table only ever contains keys with
/// work in flight. Waiters on one key are woken in the order they queued.
#[derive(Debug, Default)]
pub struct KeyedSerializer {
    locks: Mutex<HashMap<String, KeyLock>>,
}

impl KeyedSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` while holding the lock for `key` and return its output.
    ///
    /// The lock is released when `work` finishes, panics, or when the
    /// returned future is dropped, so a failed run never blocks the next one.
    pub async fn run<F, Fut, T>(&self, key: &str, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let lease = self.lease(key);
        let _guard = lease.lock.lock().await;
        work().await
    }

    /// Number of keys that currently have work running or waiting
    pub fn active_keys(&self) -> usize {
        self.table().len()
    }

    fn lease(&self, key: &str) -> Lease<'_> {
        let lock = Arc::clone(self.table().entry(key.to_string()).or_default());
        Lease {
            owner: self,
            key: key.to_string(),
            lock,
        }
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<String, KeyLock>> {
        self.locks.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A caller's claim on a key's lock; removes the table entry when it is the last one.
struct Lease<'a> {
    owner: &'a KeyedSerializer,
    key: String,
    lock: KeyLock,
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        let mut table = self.owner.table();
        // Clones are only handed out under the table lock, so two references
        // (table + this lease) means nobody else is holding or waiting.
        if Arc::strong_count(&self.lock) == 2 {
            table.remove(&self.key);
        }
    }
}
