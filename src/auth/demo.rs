//! Locally registered demo accounts.
//!
//! Stored as an ordered JSON array under [`DEMO_ACCOUNTS_KEY`]. Emails and
//! passwords are compared as exact strings; passwords are kept in clear text
//! so records stay compatible with existing clients.

use crate::storage::{KvStore, DEMO_ACCOUNTS_KEY};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A self-registered demo account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoAccount {
    pub email: String,
    pub password: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Demo account registry.
pub struct DemoAccountStore {
    storage: Arc<dyn KvStore>,
}

impl DemoAccountStore {
    pub fn new(storage: Arc<dyn KvStore>) -> Self {
        Self { storage }
    }

    /// All accounts in registration order. Missing or unreadable data reads
    /// as an empty list.
    pub fn list(&self) -> Vec<DemoAccount> {
        let raw = match self.storage.get(DEMO_ACCOUNTS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read demo accounts: {e}");
                return Vec::new();
            }
        };

        parse_accounts(&raw)
    }

    /// Append a new account. Returns `Ok(false)` without writing when the
    /// email is already registered.
    ///
    /// The duplicate check and the append run as one storage update, so
    /// overlapping registrations never drop each other's accounts.
    pub fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut registered = false;
        self.storage.update(DEMO_ACCOUNTS_KEY, &mut |current| {
            let mut accounts = current.as_deref().map(parse_accounts).unwrap_or_default();
            if accounts.iter().any(|a| a.email == email) {
                registered = false;
                return Ok(None);
            }

            accounts.push(DemoAccount {
                email: email.to_string(),
                password: password.to_string(),
                name: name.to_string(),
                created_at: now,
            });
            registered = true;
            Ok(Some(serde_json::to_string(&accounts)?))
        })?;
        Ok(registered)
    }

    /// First account whose email and password both match exactly.
    pub fn find_matching(&self, email: &str, password: &str) -> Option<DemoAccount> {
        self.list()
            .into_iter()
            .find(|a| a.email == email && a.password == password)
    }
}

fn parse_accounts(raw: &str) -> Vec<DemoAccount> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!("Ignoring unreadable demo account list: {e}");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryKvStore, SqliteKvStore};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap()
    }

    fn setup() -> (Arc<MemoryKvStore>, DemoAccountStore) {
        let kv = Arc::new(MemoryKvStore::new());
        let store = DemoAccountStore::new(kv.clone());
        (kv, store)
    }

    #[test]
    fn empty_when_nothing_stored() {
        let (_kv, store) = setup();
        assert!(store.list().is_empty());
    }

    #[test]
    fn register_appends_in_order() {
        let (_kv, store) = setup();
        assert!(store.register("a@x.com", "p", "A", now()).unwrap());
        assert!(store.register("b@x.com", "q", "B", now()).unwrap());

        let emails: Vec<_> = store.list().into_iter().map(|a| a.email).collect();
        assert_eq!(emails, vec!["a@x.com", "b@x.com"]);
    }

    #[test]
    fn duplicate_email_is_rejected_without_mutation() {
        let (_kv, store) = setup();
        assert!(store.register("a@x.com", "p", "A", now()).unwrap());
        assert!(!store.register("a@x.com", "p2", "B", now()).unwrap());

        let accounts = store.list();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].password, "p");
        assert_eq!(accounts[0].name, "A");
    }

    #[test]
    fn email_comparison_is_case_sensitive() {
        let (_kv, store) = setup();
        assert!(store.register("a@x.com", "p", "A", now()).unwrap());
        assert!(store.register("A@X.com", "p", "Upper", now()).unwrap());
        assert_eq!(store.list().len(), 2);
        assert!(store.find_matching("A@x.com", "p").is_none());
    }

    #[test]
    fn find_matching_requires_both_fields() {
        let (_kv, store) = setup();
        store.register("a@x.com", "secret", "A", now()).unwrap();

        assert_eq!(store.find_matching("a@x.com", "secret").unwrap().name, "A");
        assert!(store.find_matching("a@x.com", "Secret").is_none());
        assert!(store.find_matching("b@x.com", "secret").is_none());
    }

    #[test]
    fn persisted_shape_uses_camel_case() {
        let (kv, store) = setup();
        store.register("a@x.com", "p", "A", now()).unwrap();

        let raw = kv.get(DEMO_ACCOUNTS_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["email"], "a@x.com");
        assert_eq!(value[0]["password"], "p");
        assert_eq!(value[0]["name"], "A");
        assert!(value[0]["createdAt"].as_str().unwrap().starts_with("2026-10-19T08:00:00"));
    }

    #[test]
    fn corrupt_list_reads_as_empty_and_is_left_in_place() {
        let (kv, store) = setup();
        kv.set(DEMO_ACCOUNTS_KEY, "[{broken").unwrap();
        assert!(store.list().is_empty());
        assert_eq!(kv.get(DEMO_ACCOUNTS_KEY).unwrap().as_deref(), Some("[{broken"));
    }

    #[test]
    fn concurrent_registrations_are_all_kept() {
        let store = DemoAccountStore::new(Arc::new(SqliteKvStore::in_memory().unwrap()));

        let results: Vec<bool> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..32)
                .map(|i| {
                    let store = &store;
                    s.spawn(move || {
                        store
                            .register(&format!("u{i}@x.com"), "p", "n", now())
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(results.iter().all(|ok| *ok));
        let mut emails: Vec<_> = store.list().into_iter().map(|a| a.email).collect();
        emails.sort();
        emails.dedup();
        assert_eq!(emails.len(), 32);
    }

    #[test]
    fn concurrent_duplicate_registrations_admit_exactly_one() {
        let (_kv, store) = setup();

        let admitted = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let store = &store;
                    s.spawn(move || {
                        store
                            .register("same@x.com", "p", &format!("n{i}"), now())
                            .unwrap()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });

        assert_eq!(admitted, 1);
        assert_eq!(store.list().len(), 1);
    }
}
