//! Unified entry points for the rest of the application.
//!
//! Three login paths produce a [`Session`]:
//! - access key from the [`KeyRegistry`] (long-lived)
//! - transport token carrying today's date and an access key (long-lived)
//! - demo account credentials (short-lived)
//!
//! Key-based sessions are re-checked against the registry on every
//! [`Authenticator::is_authenticated`] call, so removing a key from the
//! registry revokes its sessions on the next check.

use super::clock::Clock;
use super::demo::DemoAccountStore;
use super::keys::KeyRegistry;
use super::session::{format_remaining_millis, Session, SessionStore, SessionSubject};
use super::token;
use crate::storage::KvStore;
use chrono::Duration;
use serde::Serialize;
use std::sync::Arc;

/// Default lifetime of key-based sessions.
pub const DEFAULT_KEY_SESSION_HOURS: i64 = 24;

/// Default lifetime of demo sessions.
pub const DEFAULT_DEMO_SESSION_HOURS: i64 = 2;

/// How long each kind of session lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLifetimes {
    pub key: Duration,
    pub demo: Duration,
}

impl Default for SessionLifetimes {
    fn default() -> Self {
        Self {
            key: Duration::hours(DEFAULT_KEY_SESSION_HOURS),
            demo: Duration::hours(DEFAULT_DEMO_SESSION_HOURS),
        }
    }
}

/// Point-in-time view of the authentication state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub is_demo: bool,
    pub demo_user_name: Option<String>,
    pub remaining_ms: i64,
    pub remaining: String,
}

/// Session authentication over explicit storage, key list, and clock handles.
pub struct Authenticator {
    registry: Arc<KeyRegistry>,
    sessions: SessionStore,
    demo_accounts: DemoAccountStore,
    clock: Arc<dyn Clock>,
    lifetimes: SessionLifetimes,
}

impl Authenticator {
    pub fn new(
        storage: Arc<dyn KvStore>,
        registry: Arc<KeyRegistry>,
        clock: Arc<dyn Clock>,
        lifetimes: SessionLifetimes,
    ) -> Self {
        tracing::debug!(
            backend = storage.name(),
            keys = registry.len(),
            "Authenticator initialized"
        );
        Self {
            registry,
            sessions: SessionStore::new(storage.clone()),
            demo_accounts: DemoAccountStore::new(storage),
            clock,
            lifetimes,
        }
    }

    pub fn is_valid_key(&self, candidate: &str) -> bool {
        self.registry.is_valid_key(candidate)
    }

    /// Log in with an access key.
    pub fn login(&self, key: &str) -> bool {
        if !self.registry.is_valid_key(key) {
            tracing::info!("Key login rejected");
            return false;
        }
        let started = self.start_session(SessionSubject::Key(key.to_uppercase()));
        if started {
            tracing::info!("Key login succeeded");
        }
        started
    }

    /// Log in with a transport token. The embedded date must be today's
    /// local date and the embedded key must still be in the registry.
    pub fn login_with_hex(&self, token: &str) -> bool {
        let decoded = match token::decode(token) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::debug!("Transport token rejected: {e}");
                return false;
            }
        };

        let today = token::format_token_date(self.clock.today());
        if decoded.date != today {
            tracing::info!(token_date = %decoded.date, "Transport token is not for today");
            return false;
        }
        if !self.registry.is_valid_key(&decoded.key) {
            tracing::info!("Transport token carries an unknown key");
            return false;
        }

        let started = self.start_session(SessionSubject::Key(decoded.key));
        if started {
            tracing::info!("Token login succeeded");
        }
        started
    }

    /// Log in with demo account credentials.
    pub fn login_demo(&self, email: &str, password: &str) -> bool {
        let Some(account) = self.demo_accounts.find_matching(email, password) else {
            tracing::info!("Demo login rejected");
            return false;
        };

        self.start_session(SessionSubject::Demo {
            email: account.email,
            name: account.name,
        })
    }

    /// Register a demo account and log it in. Returns `false` when the
    /// email is already taken.
    pub fn register_demo(&self, email: &str, password: &str, name: &str) -> bool {
        match self
            .demo_accounts
            .register(email, password, name, self.clock.now())
        {
            Ok(true) => {
                tracing::info!("Demo account registered");
                self.login_demo(email, password)
            }
            Ok(false) => {
                tracing::info!("Demo registration rejected: email already registered");
                false
            }
            Err(e) => {
                tracing::warn!("Failed to persist demo account: {e}");
                false
            }
        }
    }

    /// Drop the current session.
    pub fn logout(&self) {
        self.sessions.clear();
        tracing::info!("Logged out");
    }

    /// Whether a live session exists. Expired sessions and key sessions whose
    /// key left the registry are cleared as a side effect.
    pub fn is_authenticated(&self) -> bool {
        let Some(session) = self.sessions.load() else {
            return false;
        };

        if self.clock.now() > session.expires_at {
            tracing::info!("Session expired");
            self.sessions.clear();
            return false;
        }

        if let Some(key) = session.key() {
            if !self.registry.is_valid_key(key) {
                tracing::info!("Session key revoked");
                self.sessions.clear();
                return false;
            }
        }

        true
    }

    pub fn current_session(&self) -> Option<Session> {
        self.sessions.load()
    }

    pub fn is_demo_session(&self) -> bool {
        self.sessions.load().is_some_and(|s| s.is_demo())
    }

    pub fn demo_user_name(&self) -> Option<String> {
        self.sessions
            .load()
            .and_then(|s| s.demo_name().map(str::to_string))
    }

    pub fn remaining_millis(&self) -> i64 {
        self.sessions.remaining_millis(self.clock.as_ref())
    }

    pub fn format_remaining(&self) -> String {
        self.sessions.format_remaining(self.clock.as_ref())
    }

    /// Snapshot for status displays. Runs the full authentication check first.
    pub fn status(&self) -> AuthStatus {
        let authenticated = self.is_authenticated();
        let session = self.sessions.load();
        let remaining_ms = session
            .as_ref()
            .map(|s| s.remaining_millis(self.clock.now()))
            .unwrap_or(0);

        AuthStatus {
            authenticated,
            is_demo: session.as_ref().is_some_and(Session::is_demo),
            demo_user_name: session
                .as_ref()
                .and_then(|s| s.demo_name().map(str::to_string)),
            remaining_ms,
            remaining: format_remaining_millis(remaining_ms),
        }
    }

    /// Transport token for `key` on today's local date.
    pub fn mint_token(&self, key: &str) -> String {
        token::mint_for_today(self.clock.as_ref(), key)
    }

    fn start_session(&self, subject: SessionSubject) -> bool {
        let ttl = match subject {
            SessionSubject::Key(_) => self.lifetimes.key,
            SessionSubject::Demo { .. } => self.lifetimes.demo,
        };
        let now = self.clock.now();
        let Some(expires_at) = now.checked_add_signed(ttl) else {
            tracing::warn!("Session lifetime {ttl} overflows the calendar; not starting session");
            return false;
        };
        let session = Session {
            subject,
            login_time: now,
            expires_at,
        };

        match self.sessions.save(&session) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to persist session: {e}");
                false
            }
        }
    }
}
