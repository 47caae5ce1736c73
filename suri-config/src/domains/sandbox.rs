//! Script sandbox configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Script sandbox configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Wall-clock budget for one script execution
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_execution_budget"
    )]
    pub execution_budget: Duration,

    /// Interpreter loop-iteration cap, the backstop that terminates an
    /// abandoned runaway script
    #[serde(default = "default_loop_iteration_limit")]
    pub loop_iteration_limit: u64,

    /// Interpreter recursion cap
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            execution_budget: default_execution_budget(),
            loop_iteration_limit: default_loop_iteration_limit(),
            recursion_limit: default_recursion_limit(),
        }
    }
}

impl Validatable for SandboxConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(
            self.execution_budget.as_millis(),
            "execution_budget",
            self.domain_name(),
        )?;

        validate_positive(
            self.loop_iteration_limit,
            "loop_iteration_limit",
            self.domain_name(),
        )?;

        validate_positive(self.recursion_limit, "recursion_limit", self.domain_name())?;

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "sandbox"
    }
}

// Default value functions
fn default_execution_budget() -> Duration {
    Duration::from_secs(10)
}

fn default_loop_iteration_limit() -> u64 {
    100_000_000
}

fn default_recursion_limit() -> usize {
    512
}
