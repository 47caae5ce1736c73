//! Domain-specific configuration modules

pub mod http;
pub mod logging;
pub mod sandbox;
pub mod scheduler;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main Suri configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SuriConfig {
    /// Script sandbox configuration
    #[serde(default)]
    pub sandbox: sandbox::SandboxConfig,

    /// Scheduler configuration
    #[serde(default)]
    pub scheduler: scheduler::SchedulerConfig,

    /// Outbound call proxy HTTP configuration
    #[serde(default)]
    pub http: http::HttpConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,

    /// Global configuration layer, read by SECRET-typed variables that have
    /// no instance value and no declared default
    #[serde(default)]
    pub globals: HashMap<String, String>,
}

impl SuriConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.sandbox.validate()?;
        self.scheduler.validate()?;
        self.http.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = SuriConfig::default();
        serde_yaml::to_string(&config).unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = SuriConfig::default();
        assert!(config.validate_all().is_ok());
    }

    #[test]
    fn test_sample_config_round_trips() {
        let sample = SuriConfig::generate_sample();
        let parsed: SuriConfig = serde_yaml::from_str(&sample).unwrap();
        assert!(parsed.validate_all().is_ok());
    }
}
