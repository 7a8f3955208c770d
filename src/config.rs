// src/config.rs

//! Manages server configuration: loading, resolving dynamic values, and validation.

use crate::core::commitgate::{validate_names, SynchronousCommit};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::info;

/// On-disk shape of the configuration file, deserialized directly from TOML
/// before any cross-field validation runs.
#[derive(Serialize, Deserialize, Debug, Clone)]
struct RawConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_max_senders")]
    max_wal_senders: usize,
    #[serde(default)]
    synchronous_commit: SynchronousCommit,
    /// Comma-separated standby identifiers, highest priority first. Empty
    /// means no synchronous replication is configured.
    #[serde(default)]
    synchronous_standby_names: String,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            max_wal_senders: default_max_senders(),
            synchronous_commit: SynchronousCommit::default(),
            synchronous_standby_names: String::new(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    5433
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_senders() -> usize {
    10
}

/// The fully validated, immutable-once-loaded server configuration.
///
/// `synchronous_standby_names` is kept pre-parsed (validated, comma-split)
/// so reconciliation never has to re-validate syntax on the hot
/// config-change path; only [`Config::reload_standby_names`] re-parses,
/// and only when the raw string actually changed.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub max_wal_senders: usize,
    pub synchronous_commit: SynchronousCommit,
    pub synchronous_standby_names: Vec<String>,
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_str(&contents)
    }

    fn from_str(contents: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(contents).context("Failed to parse TOML config")?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let synchronous_standby_names = validate_names(&raw.synchronous_standby_names)
            .map_err(|e| anyhow!("invalid synchronous_standby_names: {e}"))?;

        let config = Config {
            host: raw.host,
            port: raw.port,
            log_level: raw.log_level,
            max_wal_senders: raw.max_wal_senders,
            synchronous_commit: raw.synchronous_commit,
            synchronous_standby_names,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the resolved configuration to ensure logical consistency.
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.max_wal_senders == 0 {
            return Err(anyhow!("max_wal_senders cannot be 0"));
        }
        if self.synchronous_standby_names.len() > self.max_wal_senders {
            return Err(anyhow!(
                "synchronous_standby_names lists more names ({}) than max_wal_senders ({})",
                self.synchronous_standby_names.len(),
                self.max_wal_senders
            ));
        }
        Ok(())
    }

    /// Re-parses `synchronous_standby_names` from a freshly reloaded raw
    /// string, returning the new list without mutating `self` — callers
    /// apply it via [`crate::core::commitgate::reconcile_sync_standbys_defined`]
    /// so the change takes effect through the same path a config-reload
    /// signal would.
    pub fn reparse_standby_names(raw: &str) -> Result<Vec<String>> {
        validate_names(raw).map_err(|e| anyhow!("invalid synchronous_standby_names: {e}"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_raw(RawConfig::default()).expect("default config must validate")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_sync_standbys() {
        let config = Config::default();
        assert!(config.synchronous_standby_names.is_empty());
        assert_eq!(config.synchronous_commit, SynchronousCommit::RemoteFlush);
    }

    #[test]
    fn parses_standby_names_from_toml() {
        let toml = r#"
            synchronous_standby_names = "replica-a, replica-b"
            synchronous_commit = "remote_write"
        "#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(
            config.synchronous_standby_names,
            vec!["replica-a".to_string(), "replica-b".to_string()]
        );
        assert_eq!(config.synchronous_commit, SynchronousCommit::RemoteWrite);
    }

    #[test]
    fn rejects_malformed_standby_names() {
        let toml = r#"synchronous_standby_names = "a,,b""#;
        assert!(Config::from_str(toml).is_err());
    }

    #[test]
    fn rejects_more_names_than_senders() {
        let toml = r#"
            max_wal_senders = 1
            synchronous_standby_names = "a,b"
        "#;
        assert!(Config::from_str(toml).is_err());
    }

    #[test]
    fn reparse_standby_names_is_usable_standalone() {
        let names = Config::reparse_standby_names("one, two").unwrap();
        assert_eq!(names, vec!["one".to_string(), "two".to_string()]);
        info!(?names, "reparsed for test");
    }
}
