//! Scheduler configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum number of script executions running at the same time across
    /// all widget instances
    #[serde(default = "default_max_concurrent_runs")]
    pub max_concurrent_runs: usize,

    /// Refresh interval applied when a widget manifest does not declare one
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_refresh_interval"
    )]
    pub default_refresh_interval: Duration,

    /// Backoff policy for consecutively failing instances
    #[serde(default)]
    pub backoff: BackoffConfig,
}

/// Capped exponential backoff on consecutive failed ticks.
///
/// Disabled by default: a failed tick leaves the instance eligible for its
/// next scheduled tick unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Whether consecutive failures stretch the effective interval
    #[serde(default = "crate::domains::utils::default_false")]
    pub enabled: bool,

    /// Upper bound for the stretched interval
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_max_backoff_interval"
    )]
    pub max_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_runs: default_max_concurrent_runs(),
            default_refresh_interval: default_refresh_interval(),
            backoff: BackoffConfig::default(),
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_interval: default_max_backoff_interval(),
        }
    }
}

impl Validatable for SchedulerConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(
            self.max_concurrent_runs,
            "max_concurrent_runs",
            self.domain_name(),
        )?;

        validate_positive(
            self.default_refresh_interval.as_secs(),
            "default_refresh_interval",
            self.domain_name(),
        )?;

        self.backoff.validate()?;

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "scheduler"
    }
}

impl Validatable for BackoffConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(
            self.max_interval.as_secs(),
            "max_interval",
            self.domain_name(),
        )?;

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "scheduler.backoff"
    }
}

// Default value functions
fn default_max_concurrent_runs() -> usize {
    num_cpus::get()
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_max_backoff_interval() -> Duration {
    Duration::from_secs(900)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_config_defaults() {
        let config = SchedulerConfig::default();
        assert!(config.max_concurrent_runs > 0);
        assert_eq!(config.default_refresh_interval, Duration::from_secs(60));
        assert!(!config.backoff.enabled);
    }

    #[test]
    fn test_scheduler_config_validation() {
        let mut config = SchedulerConfig::default();
        assert!(config.validate().is_ok());

        config.max_concurrent_runs = 0;
        assert!(config.validate().is_err());

        config = SchedulerConfig::default();
        config.backoff.max_interval = Duration::from_secs(0);
        assert!(config.validate().is_err());
    }
}
