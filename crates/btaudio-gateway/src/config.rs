//! Process configuration (§4.8, §6.2): rendezvous socket path, suggested
//! response buffer size, log level/format, shutdown grace period.
//!
//! Loaded from an optional TOML file, layered under built-in defaults and
//! over environment-variable overrides — deliberately simpler than the
//! teacher's `config` crate + hot-reload machinery, since this gateway reads
//! its configuration once at startup and never reloads it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{GatewayError, Result};

fn default_socket_path() -> PathBuf {
    PathBuf::from("/var/run/btaudio/gateway.sock")
}

fn default_suggested_buffer_size() -> usize {
    btaudio_proto::wire::SUGGESTED_BUFFER_SIZE
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_shutdown_grace() -> Duration {
    Duration::from_millis(500)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    #[serde(default = "default_suggested_buffer_size")]
    pub suggested_buffer_size: usize,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    #[serde(default = "default_shutdown_grace", with = "humantime_millis")]
    pub shutdown_grace: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            socket_path: default_socket_path(),
            suggested_buffer_size: default_suggested_buffer_size(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            shutdown_grace: default_shutdown_grace(),
        }
    }
}

impl GatewayConfig {
    /// Load from an optional TOML file, then apply `BTAUDIO_*` environment
    /// overrides on top. A missing `path` is not an error — defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(GatewayError::Io)?;
                toml::from_str(&text)?
            }
            None => GatewayConfig::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("BTAUDIO_SOCKET_PATH") {
            self.socket_path = PathBuf::from(path);
        }
        if let Ok(level) = std::env::var("BTAUDIO_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Ok(size) = std::env::var("BTAUDIO_BUFFER_SIZE") {
            if let Ok(size) = size.parse() {
                self.suggested_buffer_size = size;
            }
        }
    }
}

/// `serde` helper for `Duration` as whole milliseconds, since `toml` has no
/// native duration type.
mod humantime_millis {
    use super::Duration;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_self_consistent() {
        let config = GatewayConfig::default();
        assert_eq!(config.suggested_buffer_size, btaudio_proto::wire::SUGGESTED_BUFFER_SIZE);
    }

    #[test]
    fn loads_from_toml() {
        let toml_text = r#"
            socket_path = "/tmp/example.sock"
            log_level = "debug"
            suggested_buffer_size = 2048
            shutdown_grace = 1000
        "#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        std::fs::write(&path, toml_text).unwrap();

        let config = GatewayConfig::load(Some(&path)).unwrap();
        assert_eq!(config.socket_path, PathBuf::from("/tmp/example.sock"));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.suggested_buffer_size, 2048);
        assert_eq!(config.shutdown_grace, Duration::from_millis(1000));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        std::fs::write(&path, "typo_field = 1\n").unwrap();
        assert!(GatewayConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn env_override_wins_over_file_and_defaults() {
        std::env::set_var("BTAUDIO_LOG_LEVEL", "trace");
        let config = GatewayConfig::load(None).unwrap();
        assert_eq!(config.log_level, "trace");
        std::env::remove_var("BTAUDIO_LOG_LEVEL");
    }
}
