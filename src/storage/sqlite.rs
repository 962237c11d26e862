//! SQLite-backed key/value store.
//!
//! Table:
//! - `kv`: key, value, updated_at
//!
//! One file per data directory. WAL mode keeps a concurrently running
//! `keygate serve` and one-shot CLI invocations from tripping over each other.

use super::KvStore;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::OptionalExtension;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

const UPSERT_SQL: &str = "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
     ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at";

/// Thread-safe SQLite key/value store.
#[derive(Debug)]
pub struct SqliteKvStore {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteKvStore {
    /// Open (or create) the store at the given path.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create data directory {}", parent.display())
                })?;
            }
        }

        let conn = rusqlite::Connection::open(db_path)
            .with_context(|| format!("Failed to open {}", db_path.display()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Self::init_tables(&conn)?;

        tracing::debug!(path = %db_path.display(), "Opened key/value store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (tests, ephemeral runs).
    pub fn in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        Self::init_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_tables(conn: &rusqlite::Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );",
        )?;
        Ok(())
    }
}

impl KvStore for SqliteKvStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let row = conn.query_row(
            "SELECT value FROM kv WHERE key = ?1",
            rusqlite::params![key],
            |row| row.get::<_, String>(0),
        );

        match row {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            UPSERT_SQL,
            rusqlite::params![key, value, epoch_secs() as i64],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM kv WHERE key = ?1", rusqlite::params![key])?;
        Ok(())
    }

    // BEGIN IMMEDIATE takes the database write lock up front, so other
    // connections to the same file (another keygate process) wait on
    // busy_timeout instead of interleaving with this read-modify-write.
    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<String>) -> Result<Option<String>>,
    ) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        let current = tx
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        if let Some(next) = apply(current)? {
            tx.execute(
                UPSERT_SQL,
                rusqlite::params![key, next, epoch_secs() as i64],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn in_memory_roundtrip() {
        let store = SqliteKvStore::in_memory().unwrap();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));

        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("keygate.db");

        {
            let store = SqliteKvStore::open(&path).unwrap();
            store.set("keygate.session", r#"{"key":"ABC123"}"#).unwrap();
        }

        let store = SqliteKvStore::open(&path).unwrap();
        assert_eq!(
            store.get("keygate.session").unwrap().as_deref(),
            Some(r#"{"key":"ABC123"}"#)
        );
    }

    #[test]
    fn failed_update_rolls_back() {
        let store = SqliteKvStore::in_memory().unwrap();
        store.set("k", "v1").unwrap();
        assert!(store
            .update("k", &mut |_| anyhow::bail!("rejected"))
            .is_err());
        store.update("k", &mut |_| Ok(None)).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v1"));
    }

    #[test]
    fn updates_from_two_connections_do_not_interleave() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("keygate.db");
        let first = SqliteKvStore::open(&path).unwrap();
        let second = SqliteKvStore::open(&path).unwrap();

        std::thread::scope(|s| {
            for store in [&first, &second] {
                for _ in 0..4 {
                    s.spawn(move || {
                        for _ in 0..25 {
                            store
                                .update("counter", &mut |current| {
                                    let n: u32 =
                                        current.as_deref().unwrap_or("0").parse()?;
                                    Ok(Some((n + 1).to_string()))
                                })
                                .unwrap();
                        }
                    });
                }
            }
        });

        assert_eq!(first.get("counter").unwrap().as_deref(), Some("200"));
    }

    #[test]
    fn keys_are_independent() {
        let store = SqliteKvStore::in_memory().unwrap();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
    }
}
