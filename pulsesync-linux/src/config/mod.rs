use std::{os::unix::fs::PermissionsExt, path::Path, time::Duration};

use log::warn;
use pulsesync::config::ControllerConfig;
use serde::Deserialize;
use thiserror::Error;
use tokio::{fs::read_to_string, io};

use crate::observer::StatusFormat;

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub loglevel: Option<log::LevelFilter>,
    #[serde(default)]
    pub liveness_interval_ms: Option<u64>,
    #[serde(default)]
    pub liveness_timeout_ms: Option<u64>,
    #[serde(default)]
    pub broadcast_interval_ms: Option<u64>,
    #[serde(default)]
    pub status_format: Option<StatusFormat>,
}

impl Config {
    /// Parse config from file
    pub async fn from_file(file: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let meta = std::fs::metadata(&file)?;
        let perm = meta.permissions();

        if perm.mode() as libc::mode_t & libc::S_IWOTH != 0 {
            warn!("Unrestricted config file permissions: Others can write.");
        }

        let contents = read_to_string(file).await?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Config, ConfigError> {
        Ok(toml::de::from_str(contents)?)
    }

    /// Timing of the controller, defaults for everything not configured
    pub fn controller(&self) -> ControllerConfig {
        let defaults = ControllerConfig::default();
        let millis = |value: Option<u64>, default| value.map_or(default, Duration::from_millis);

        ControllerConfig {
            liveness_interval: millis(self.liveness_interval_ms, defaults.liveness_interval),
            liveness_timeout: millis(self.liveness_timeout_ms, defaults.liveness_timeout),
            broadcast_interval: millis(self.broadcast_interval_ms, defaults.broadcast_interval),
        }
    }

    /// Check that the config is reasonable
    pub fn check(&self) -> bool {
        let mut ok = true;

        let periods = [
            ("liveness-interval-ms", self.liveness_interval_ms),
            ("liveness-timeout-ms", self.liveness_timeout_ms),
            ("broadcast-interval-ms", self.broadcast_interval_ms),
        ];

        for (name, value) in periods {
            if value == Some(0) {
                warn!("{name} must not be zero.");
                ok = false;
            }
        }

        let controller = self.controller();
        if controller.liveness_timeout <= controller.broadcast_interval {
            warn!("liveness-timeout-ms does not exceed broadcast-interval-ms, masters will be dropped between pulses.");
        }

        ok
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("io error while reading config: {0}")]
    Io(#[from] io::Error),
    #[error("config toml parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration")]
    Invalid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_default() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.controller(), ControllerConfig::default());
        assert!(config.check());
    }

    #[test]
    fn full_config() {
        let config = Config::from_toml(
            r#"
            loglevel = "debug"
            liveness-interval-ms = 3000
            liveness-timeout-ms = 2500
            broadcast-interval-ms = 500
            status-format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.loglevel, Some(log::LevelFilter::Debug));
        assert_eq!(config.status_format, Some(StatusFormat::Json));

        let controller = config.controller();
        assert_eq!(controller.liveness_interval, Duration::from_millis(3000));
        assert_eq!(controller.liveness_timeout, Duration::from_millis(2500));
        assert_eq!(controller.broadcast_interval, Duration::from_millis(500));
        assert!(config.check());
    }

    #[test]
    fn unknown_key_is_rejected() {
        let error = Config::from_toml("sdo-id = 1").unwrap_err();
        assert!(matches!(error, ConfigError::Toml(_)));
    }

    #[test]
    fn zero_period_fails_check() {
        let config = Config::from_toml("broadcast-interval-ms = 0").unwrap();
        assert!(!config.check());
    }

    #[tokio::test]
    async fn missing_file() {
        let error = Config::from_file("/nonexistent/pulsesync.toml")
            .await
            .unwrap_err();
        assert!(matches!(error, ConfigError::Io(_)));
    }
}
