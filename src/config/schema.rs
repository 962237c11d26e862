use crate::auth::authenticator::{DEFAULT_DEMO_SESSION_HOURS, DEFAULT_KEY_SESSION_HOURS};
use crate::auth::monitor::DEFAULT_RECHECK_INTERVAL_SECS;
use crate::auth::{KeyRegistry, SessionLifetimes};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the session database lives. `~` is expanded.
    pub data_dir: String,
    pub auth: AuthConfig,
    pub gateway: GatewayConfig,

    /// Path this config was loaded from (not serialized).
    #[serde(skip)]
    pub config_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: "~/.keygate".into(),
            auth: AuthConfig::default(),
            gateway: GatewayConfig::default(),
            config_path: PathBuf::new(),
        }
    }
}

/// `[auth]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Lifetime of sessions opened with an access key or transport token.
    pub key_session_hours: i64,
    /// Lifetime of demo sessions.
    pub demo_session_hours: i64,
    /// How often `watch`/`serve` re-check the session.
    pub recheck_interval_secs: u64,
    /// Override the compiled-in key list. Empty = built-in keys.
    pub access_keys: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            key_session_hours: DEFAULT_KEY_SESSION_HOURS,
            demo_session_hours: DEFAULT_DEMO_SESSION_HOURS,
            recheck_interval_secs: DEFAULT_RECHECK_INTERVAL_SECS,
            access_keys: Vec::new(),
        }
    }
}

impl AuthConfig {
    /// Hours out of `TimeDelta` range saturate; the authenticator then
    /// refuses to start such sessions.
    pub fn lifetimes(&self) -> SessionLifetimes {
        let hours = |h: i64| chrono::Duration::try_hours(h).unwrap_or(chrono::Duration::MAX);
        SessionLifetimes {
            key: hours(self.key_session_hours),
            demo: hours(self.demo_session_hours),
        }
    }

    pub fn recheck_interval(&self) -> Duration {
        Duration::from_secs(self.recheck_interval_secs)
    }

    pub fn key_registry(&self) -> KeyRegistry {
        if self.access_keys.is_empty() {
            KeyRegistry::builtin()
        } else {
            KeyRegistry::from_keys(&self.access_keys)
        }
    }
}

/// `[gateway]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Allow binding to a non-loopback address.
    pub allow_public_bind: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            allow_public_bind: false,
        }
    }
}
