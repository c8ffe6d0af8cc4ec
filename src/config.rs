//! Desk configuration, loaded from TOML. Every key has a default, so an
//! empty file (or no file) is a valid configuration.

use crate::model::TenantId;
use crate::timeline::EtaOffsets;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeskConfig {
    #[serde(default = "default_tenant")]
    pub tenant: TenantId,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Countdown refresh period of each alert.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Client-side timeout of one accept call. Unrelated to the order's
    /// own acceptance deadline.
    #[serde(default = "default_accept_timeout_secs")]
    pub accept_timeout_secs: u64,

    /// Shortest acceptance window the storefront hands out.
    #[serde(default = "default_min_acceptance_window_secs")]
    pub min_acceptance_window_secs: u64,

    /// Age after which the last successful poll counts as stale.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,

    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,

    #[serde(default)]
    pub timeline: TimelineConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineConfig {
    #[serde(default = "default_refetch_interval_secs")]
    pub refetch_interval_secs: u64,

    #[serde(default)]
    pub eta: EtaOffsets,
}

fn default_tenant() -> TenantId {
    TenantId::from("default")
}

const fn default_poll_interval_secs() -> u64 {
    10
}

const fn default_tick_interval_ms() -> u64 {
    1000
}

const fn default_accept_timeout_secs() -> u64 {
    8
}

const fn default_min_acceptance_window_secs() -> u64 {
    60
}

const fn default_stale_after_secs() -> u64 {
    30
}

const fn default_mailbox_capacity() -> usize {
    64
}

const fn default_refetch_interval_secs() -> u64 {
    15
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            tenant: default_tenant(),
            poll_interval_secs: default_poll_interval_secs(),
            tick_interval_ms: default_tick_interval_ms(),
            accept_timeout_secs: default_accept_timeout_secs(),
            min_acceptance_window_secs: default_min_acceptance_window_secs(),
            stale_after_secs: default_stale_after_secs(),
            mailbox_capacity: default_mailbox_capacity(),
            timeline: TimelineConfig::default(),
        }
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            refetch_interval_secs: default_refetch_interval_secs(),
            eta: EtaOffsets::default(),
        }
    }
}

impl DeskConfig {
    /// Load and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: DeskConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects zero periods, and a poll interval so long that an order with
    /// the shortest window could be placed and auto-accepted between two
    /// polls without ever being shown.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            ("poll_interval_secs", self.poll_interval_secs),
            ("tick_interval_ms", self.tick_interval_ms),
            ("accept_timeout_secs", self.accept_timeout_secs),
            ("timeline.refetch_interval_secs", self.timeline.refetch_interval_secs),
        ];
        if let Some((key, _)) = periods.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Validation(format!("{key} must be greater than zero")));
        }
        if self.mailbox_capacity == 0 {
            return Err(ConfigError::Validation(
                "mailbox_capacity must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval_secs.saturating_mul(2) > self.min_acceptance_window_secs {
            return Err(ConfigError::Validation(format!(
                "poll_interval_secs ({}) must be at most half of min_acceptance_window_secs ({})",
                self.poll_interval_secs, self.min_acceptance_window_secs
            )));
        }
        if !self.timeline.eta.is_shrinking() {
            return Err(ConfigError::Validation(
                "timeline.eta offsets must not grow from one stage to the next".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn accept_timeout(&self) -> Duration {
        Duration::from_secs(self.accept_timeout_secs)
    }

    pub fn min_acceptance_window(&self) -> Duration {
        Duration::from_secs(self.min_acceptance_window_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn refetch_interval(&self) -> Duration {
        Duration::from_secs(self.timeline.refetch_interval_secs)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_takes_defaults() {
        let config = DeskConfig::from_toml("").unwrap();
        assert_eq!(config, DeskConfig::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_config() {
        let config = DeskConfig::from_toml(
            r#"
            tenant = "corner-shop"
            poll_interval_secs = 5

            [timeline]
            refetch_interval_secs = 30
            eta = { shipped_minutes = 10 }
            "#,
        )
        .unwrap();
        assert_eq!(config.tenant, TenantId::from("corner-shop"));
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.accept_timeout_secs, 8);
        assert_eq!(config.timeline.refetch_interval_secs, 30);
        assert_eq!(config.timeline.eta.shipped_minutes, 10);
        assert_eq!(config.timeline.eta.pending_minutes, 60);
    }

    #[test]
    fn test_rejects_poll_interval_longer_than_half_the_window() {
        let err = DeskConfig::from_toml(
            r#"
            poll_interval_secs = 40
            min_acceptance_window_secs = 60
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("poll_interval_secs"));
    }

    #[test]
    fn test_rejects_zero_periods() {
        let err = DeskConfig::from_toml("tick_interval_ms = 0").unwrap_err();
        assert!(err.to_string().contains("tick_interval_ms"));
    }

    #[test]
    fn test_rejects_growing_eta() {
        let err = DeskConfig::from_toml("[timeline.eta]\nshipped_minutes = 90").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tenant = \"night-market\"").unwrap();
        let config = DeskConfig::from_file(file.path()).unwrap();
        assert_eq!(config.tenant, TenantId::from("night-market"));

        let missing = DeskConfig::from_file(Path::new("/nonexistent/desk.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
