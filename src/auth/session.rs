//! Single current-session record.
//!
//! Persisted as JSON under [`SESSION_KEY`]:
//! `{"key": ..}` or `{"email": .., "name": .., "isDemo": true}` plus
//! `loginTime` / `expiresAt` in epoch milliseconds. A record that fails to
//! parse or has an inconsistent shape is cleared on read.

use super::clock::Clock;
use crate::storage::{KvStore, SESSION_KEY};
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const MILLIS_PER_HOUR: i64 = 3_600_000;
const MILLIS_PER_MINUTE: i64 = 60_000;

/// Who the session was issued to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSubject {
    /// Logged in with an access key (stored upper-case).
    Key(String),
    /// Logged in with a demo account.
    Demo { email: String, name: String },
}

/// The active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub subject: SessionSubject,
    pub login_time: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_demo(&self) -> bool {
        matches!(self.subject, SessionSubject::Demo { .. })
    }

    pub fn key(&self) -> Option<&str> {
        match &self.subject {
            SessionSubject::Key(key) => Some(key),
            SessionSubject::Demo { .. } => None,
        }
    }

    pub fn demo_name(&self) -> Option<&str> {
        match &self.subject {
            SessionSubject::Demo { name, .. } => Some(name),
            SessionSubject::Key(_) => None,
        }
    }

    /// Milliseconds until expiry, floored at zero.
    pub fn remaining_millis(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_milliseconds().max(0)
    }
}

/// On-disk shape of a session.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    is_demo: bool,
    login_time: i64,
    expires_at: i64,
}

impl From<&Session> for SessionRecord {
    fn from(session: &Session) -> Self {
        let (key, email, name) = match &session.subject {
            SessionSubject::Key(key) => (Some(key.clone()), None, None),
            SessionSubject::Demo { email, name } => (None, Some(email.clone()), Some(name.clone())),
        };
        Self {
            key,
            email,
            name,
            is_demo: session.is_demo(),
            login_time: session.login_time.timestamp_millis(),
            expires_at: session.expires_at.timestamp_millis(),
        }
    }
}

impl TryFrom<SessionRecord> for Session {
    type Error = anyhow::Error;

    fn try_from(record: SessionRecord) -> Result<Self> {
        let subject = if record.is_demo {
            match (record.email, record.name) {
                (Some(email), Some(name)) => SessionSubject::Demo { email, name },
                _ => bail!("demo session without email/name"),
            }
        } else {
            match record.key {
                Some(key) => SessionSubject::Key(key),
                None => bail!("key session without key"),
            }
        };

        let login_time = DateTime::from_timestamp_millis(record.login_time)
            .ok_or_else(|| anyhow::anyhow!("loginTime out of range"))?;
        let expires_at = DateTime::from_timestamp_millis(record.expires_at)
            .ok_or_else(|| anyhow::anyhow!("expiresAt out of range"))?;

        Ok(Self {
            subject,
            login_time,
            expires_at,
        })
    }
}

/// Reads and writes the single session record.
pub struct SessionStore {
    storage: Arc<dyn KvStore>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KvStore>) -> Self {
        Self { storage }
    }

    /// The stored session, or `None` when absent or unreadable. Corrupt
    /// records are removed so the failure does not repeat on every check.
    pub fn load(&self) -> Option<Session> {
        let raw = match self.storage.get(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to read session record: {e}");
                return None;
            }
        };

        let parsed = serde_json::from_str::<SessionRecord>(&raw)
            .map_err(anyhow::Error::from)
            .and_then(Session::try_from);

        match parsed {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!("Discarding malformed session record: {e}");
                self.clear();
                None
            }
        }
    }

    /// Overwrite the stored session.
    pub fn save(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_string(&SessionRecord::from(session))?;
        self.storage.set(SESSION_KEY, &json)
    }

    /// Remove the stored session. Safe to call when none exists.
    pub fn clear(&self) {
        if let Err(e) = self.storage.remove(SESSION_KEY) {
            tracing::warn!("Failed to clear session record: {e}");
        }
    }

    /// Milliseconds left on the stored session; 0 when absent or malformed.
    pub fn remaining_millis(&self, clock: &dyn Clock) -> i64 {
        self.load()
            .map(|session| session.remaining_millis(clock.now()))
            .unwrap_or(0)
    }

    /// Remaining time as `"{hours}h {minutes}min"`.
    pub fn format_remaining(&self, clock: &dyn Clock) -> String {
        format_remaining_millis(self.remaining_millis(clock))
    }
}

/// `"{hours}h {minutes}min"`; minutes are what is left after whole hours.
pub fn format_remaining_millis(millis: i64) -> String {
    let millis = millis.max(0);
    let hours = millis / MILLIS_PER_HOUR;
    let minutes = (millis % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE;
    format!("{hours}h {minutes}min")
}
