//! Configuration of the [`SyncController`](crate::SyncController)

use core::time::Duration;

/// Timing parameters of the election and the pulse broadcast.
///
/// The defaults are the protocol's fixed values; all nodes on a segment are
/// expected to run with the same configuration.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ControllerConfig {
    /// Period of the liveness check of the chosen master
    pub liveness_interval: Duration,

    /// Silence from the chosen master after which it is presumed gone
    pub liveness_timeout: Duration,

    /// Time between two pulses while master
    pub broadcast_interval: Duration,
}

impl ControllerConfig {
    pub const DEFAULT_LIVENESS_INTERVAL: Duration = Duration::from_millis(1500);
    pub const DEFAULT_LIVENESS_TIMEOUT: Duration = Duration::from_millis(1500);
    pub const DEFAULT_BROADCAST_INTERVAL: Duration = Duration::from_millis(1000);

    /// Check that every period is non-zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            ("liveness_interval", self.liveness_interval),
            ("liveness_timeout", self.liveness_timeout),
            ("broadcast_interval", self.broadcast_interval),
        ];

        match periods.into_iter().find(|(_, period)| period.is_zero()) {
            Some((name, _)) => Err(ConfigError::ZeroPeriod(name)),
            None => Ok(()),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            liveness_interval: Self::DEFAULT_LIVENESS_INTERVAL,
            liveness_timeout: Self::DEFAULT_LIVENESS_TIMEOUT,
            broadcast_interval: Self::DEFAULT_BROADCAST_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must not be zero")]
    ZeroPeriod(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(ControllerConfig::default().validate(), Ok(()));
    }

    #[test]
    fn zero_periods_are_rejected() {
        let config = ControllerConfig {
            broadcast_interval: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroPeriod("broadcast_interval"))
        );
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "broadcast_interval must not be zero"
        );

        let config = ControllerConfig {
            liveness_interval: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroPeriod("liveness_interval"))
        );
    }
}
