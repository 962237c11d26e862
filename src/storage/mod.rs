//! Durable client-side key/value storage.
//!
//! Each auth component owns exactly one record under a well-known key and
//! stores it as JSON text. Backends only move strings around; shape checks
//! and self-healing live with the record's owner.

pub mod sqlite;

pub use sqlite::SqliteKvStore;

use anyhow::Result;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Record key for the single active session.
pub const SESSION_KEY: &str = "keygate.session";

/// Record key for the ordered list of demo accounts.
pub const DEMO_ACCOUNTS_KEY: &str = "keygate.demo_accounts";

/// Minimal string-valued storage used by the session and demo account stores.
pub trait KvStore: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Atomically read-modify-write the value under `key`.
    ///
    /// `apply` receives the current value and returns the replacement, or
    /// `None` to leave the record untouched. No other writer can interleave
    /// between the read and the write. An error from `apply` aborts without
    /// writing.
    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<String>) -> Result<Option<String>>,
    ) -> Result<()>;
}

/// Non-durable store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<String>) -> Result<Option<String>>,
    ) -> Result<()> {
        let mut entries = self.entries.lock();
        if let Some(next) = apply(entries.get(key).cloned())? {
            entries.insert(key.to_string(), next);
        }
        Ok(())
    }
}
