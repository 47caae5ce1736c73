//! Configuration loading and environment variable handling

use crate::domains::SuriConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;

/// Prefix for environment variables feeding the resolver's global layer
const GLOBAL_VALUE_PREFIX: &str = "GLOBAL_";

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "SURI".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<SuriConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: SuriConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<SuriConfig> {
        let mut config = SuriConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<SuriConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut SuriConfig) -> ConfigResult<()> {
        self.apply_sandbox_overrides(&mut config.sandbox)?;
        self.apply_scheduler_overrides(&mut config.scheduler)?;
        self.apply_http_overrides(&mut config.http)?;
        self.apply_logging_overrides(&mut config.logging)?;
        self.collect_global_values(&mut config.globals);

        Ok(())
    }

    /// Apply sandbox config overrides
    fn apply_sandbox_overrides(
        &self,
        config: &mut crate::domains::sandbox::SandboxConfig,
    ) -> ConfigResult<()> {
        if let Ok(budget) = self.get_env_var("EXECUTION_BUDGET_SECONDS") {
            let seconds: u64 = budget.parse().map_err(|e| {
                ConfigError::EnvError(format!("Invalid EXECUTION_BUDGET_SECONDS: {}", e))
            })?;
            config.execution_budget = std::time::Duration::from_secs(seconds);
        }

        if let Ok(limit) = self.get_env_var("LOOP_ITERATION_LIMIT") {
            config.loop_iteration_limit = limit.parse().map_err(|e| {
                ConfigError::EnvError(format!("Invalid LOOP_ITERATION_LIMIT: {}", e))
            })?;
        }

        Ok(())
    }

    /// Apply scheduler config overrides
    fn apply_scheduler_overrides(
        &self,
        config: &mut crate::domains::scheduler::SchedulerConfig,
    ) -> ConfigResult<()> {
        if let Ok(max_runs) = self.get_env_var("MAX_CONCURRENT_RUNS") {
            config.max_concurrent_runs = max_runs.parse().map_err(|e| {
                ConfigError::EnvError(format!("Invalid MAX_CONCURRENT_RUNS: {}", e))
            })?;
        }

        if let Ok(interval) = self.get_env_var("DEFAULT_REFRESH_SECONDS") {
            let seconds: u64 = interval.parse().map_err(|e| {
                ConfigError::EnvError(format!("Invalid DEFAULT_REFRESH_SECONDS: {}", e))
            })?;
            config.default_refresh_interval = std::time::Duration::from_secs(seconds);
        }

        Ok(())
    }

    /// Apply HTTP config overrides
    fn apply_http_overrides(
        &self,
        config: &mut crate::domains::http::HttpConfig,
    ) -> ConfigResult<()> {
        if let Ok(timeout) = self.get_env_var("HTTP_TIMEOUT") {
            let seconds: u64 = timeout
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid HTTP_TIMEOUT: {}", e)))?;
            config.timeout = std::time::Duration::from_secs(seconds);
        }

        if let Ok(user_agent) = self.get_env_var("HTTP_USER_AGENT") {
            config.user_agent = user_agent;
        }

        if let Ok(verify_ssl) = self.get_env_var("HTTP_VERIFY_SSL") {
            config.verify_ssl = verify_ssl
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid HTTP_VERIFY_SSL: {}", e)))?;
        }

        Ok(())
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        use std::str::FromStr;

        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    /// Harvest `<PREFIX>_GLOBAL_<NAME>` environment variables into the
    /// global configuration layer. Values from the environment override
    /// values from the config file, so secrets can stay out of it.
    fn collect_global_values(&self, globals: &mut std::collections::HashMap<String, String>) {
        let prefix = format!("{}_{}", self.prefix, GLOBAL_VALUE_PREFIX);
        for (key, value) in std::env::vars() {
            if let Some(name) = key.strip_prefix(&prefix) {
                if !name.is_empty() {
                    globals.insert(name.to_string(), value);
                }
            }
        }
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "sandbox:\n  execution_budget: 3\nhttp:\n  timeout: 2\nglobals:\n  API_KEY: from-file"
        )
        .unwrap();

        // Unlikely prefix so ambient SURI_* variables cannot leak in
        let loader = ConfigLoader::with_prefix("SURI_TEST_NONE");
        let config = loader.from_file(file.path()).unwrap();

        assert_eq!(config.sandbox.execution_budget.as_secs(), 3);
        assert_eq!(config.http.timeout.as_secs(), 2);
        assert_eq!(config.globals.get("API_KEY").map(String::as_str), Some("from-file"));
    }

    #[test]
    fn test_env_override_and_global_harvest() {
        std::env::set_var("SURI_TEST_HTTP_TIMEOUT", "9");
        std::env::set_var("SURI_TEST_GLOBAL_TOKEN", "from-env");

        let loader = ConfigLoader::with_prefix("SURI_TEST");
        let config = loader.from_env().unwrap();

        assert_eq!(config.http.timeout.as_secs(), 9);
        assert_eq!(config.globals.get("TOKEN").map(String::as_str), Some("from-env"));

        std::env::remove_var("SURI_TEST_HTTP_TIMEOUT");
        std::env::remove_var("SURI_TEST_GLOBAL_TOKEN");
    }

    #[test]
    fn test_invalid_env_value_is_rejected() {
        std::env::set_var("SURI_BAD_HTTP_TIMEOUT", "not-a-number");

        let loader = ConfigLoader::with_prefix("SURI_BAD");
        assert!(loader.from_env().is_err());

        std::env::remove_var("SURI_BAD_HTTP_TIMEOUT");
    }
}
