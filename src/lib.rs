#![forbid(unsafe_code)]

//! keygate — a lightweight session gate.
//!
//! Callers get in with a shared access key, a same-day URL token derived
//! from one, or a locally registered demo account. The resulting session is
//! time-bounded and stored in a local key/value store.

pub mod auth;
pub mod config;
pub mod gateway;
pub mod storage;

use anyhow::Result;
use std::sync::Arc;

/// Wire an authenticator from configuration: SQLite store under
/// `data_dir`, configured (or built-in) keys, and the system clock.
pub fn open_authenticator(config: &config::Config) -> Result<Arc<auth::Authenticator>> {
    let db_path = config.db_path()?;
    let storage: Arc<dyn storage::KvStore> = Arc::new(storage::SqliteKvStore::open(&db_path)?);
    Ok(Arc::new(auth::Authenticator::new(
        storage,
        Arc::new(config.auth.key_registry()),
        Arc::new(auth::SystemClock),
        config.auth.lifetimes(),
    )))
}
