pub mod schema;

pub use schema::{AuthConfig, Config, GatewayConfig};

use anyhow::{bail, Context, Result};
use directories::UserDirs;
use std::path::{Path, PathBuf};

/// Upper bound for either session lifetime: ten years.
pub const MAX_SESSION_HOURS: i64 = 10 * 365 * 24;

/// File name of the session database inside `data_dir`.
const DB_FILE_NAME: &str = "keygate.db";

/// `~/.keygate`
pub fn default_config_dir() -> Result<PathBuf> {
    let home = UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
    Ok(home.join(".keygate"))
}

impl Config {
    /// Load `path`, or `~/.keygate/config.toml` when `None`. A missing file
    /// yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_dir()?.join("config.toml"),
        };

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config {}", config_path.display()))?;
            toml::from_str::<Config>(&contents)
                .map_err(|e| anyhow::anyhow!("Failed to parse config: {e}"))?
        } else {
            tracing::debug!(path = %config_path.display(), "No config file; using defaults");
            Config::default()
        };

        config.config_path = config_path;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every session dead on arrival or
    /// push expiry past what the calendar can represent.
    pub fn validate(&self) -> Result<()> {
        for (field, hours) in [
            ("key_session_hours", self.auth.key_session_hours),
            ("demo_session_hours", self.auth.demo_session_hours),
        ] {
            if hours <= 0 {
                bail!("auth.{field} must be positive");
            }
            if hours > MAX_SESSION_HOURS {
                bail!("auth.{field} must be at most {MAX_SESSION_HOURS}");
            }
        }
        if self.auth.recheck_interval_secs == 0 {
            bail!("auth.recheck_interval_secs must be at least 1");
        }
        if self.data_dir.trim().is_empty() {
            bail!("data_dir cannot be empty");
        }
        Ok(())
    }

    /// `data_dir` with `~` and environment variables expanded.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let expanded = shellexpand::full(&self.data_dir)
            .map_err(|e| anyhow::anyhow!("Failed to expand data_dir: {e}"))?;
        Ok(PathBuf::from(expanded.as_ref()))
    }

    /// Path of the SQLite session database.
    pub fn db_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(DB_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_session_policy() {
        let config = Config::default();
        assert_eq!(config.auth.key_session_hours, 24);
        assert_eq!(config.auth.demo_session_hours, 2);
        assert_eq!(config.auth.recheck_interval_secs, 60);
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert!(!config.gateway.allow_public_bind);
        assert_eq!(config.auth.key_registry().len(), 52);
        config.validate().unwrap();
    }

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.config_path, path);
        assert_eq!(config.auth.key_session_hours, 24);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
data_dir = "/var/lib/keygate"

[auth]
demo_session_hours = 1
access_keys = ["abc123", "DEF456"]

[gateway]
port = 8080
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.auth.demo_session_hours, 1);
        assert_eq!(config.auth.key_session_hours, 24);
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert_eq!(
            config.db_path().unwrap(),
            PathBuf::from("/var/lib/keygate/keygate.db")
        );

        let registry = config.auth.key_registry();
        assert_eq!(registry.len(), 2);
        assert!(registry.is_valid_key("ABC123"));
    }

    #[test]
    fn invalid_toml_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[auth\nkey_session_hours = ").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn zero_lifetime_rejected() {
        let mut config = Config::default();
        config.auth.key_session_hours = 0;
        assert!(config.validate().unwrap_err().to_string().contains("key_session_hours"));

        let mut config = Config::default();
        config.auth.recheck_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_lifetime_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[auth]\nkey_session_hours = 1000000000000\n").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("key_session_hours"));

        let mut config = Config::default();
        config.auth.demo_session_hours = MAX_SESSION_HOURS + 1;
        assert!(config.validate().unwrap_err().to_string().contains("demo_session_hours"));

        config.auth.demo_session_hours = MAX_SESSION_HOURS;
        config.validate().unwrap();
    }

    #[test]
    fn unvalidated_huge_lifetime_does_not_panic() {
        let auth = AuthConfig {
            key_session_hours: i64::MAX,
            ..AuthConfig::default()
        };
        assert_eq!(auth.lifetimes().key, chrono::Duration::MAX);
    }

    #[test]
    fn lifetimes_follow_config() {
        let auth = AuthConfig {
            key_session_hours: 12,
            demo_session_hours: 1,
            ..AuthConfig::default()
        };
        let lifetimes = auth.lifetimes();
        assert_eq!(lifetimes.key, chrono::Duration::hours(12));
        assert_eq!(lifetimes.demo, chrono::Duration::hours(1));
    }
}
