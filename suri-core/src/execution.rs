//! Execution context and result types

use crate::variables::ResolvedVariable;
use crate::widget::WidgetId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ephemeral per-run context handed to the sandbox.
///
/// Built immediately before a run and dropped immediately after; never
/// shared across runs or instances.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// The instance this run belongs to
    pub widget_id: WidgetId,

    /// Resolved variables in declaration order
    pub variables: Vec<ResolvedVariable>,

    /// The last successful JSON payload, empty if none yet
    pub previous_payload: String,
}

impl ExecutionContext {
    /// Create a context for one run
    pub fn new(
        widget_id: WidgetId,
        variables: Vec<ResolvedVariable>,
        previous_payload: String,
    ) -> Self {
        Self {
            widget_id,
            variables,
            previous_payload,
        }
    }

    /// Values that must never appear in diagnostics
    pub fn sensitive_values(&self) -> Vec<&str> {
        self.variables
            .iter()
            .filter(|v| v.sensitive && !v.value.is_empty())
            .map(|v| v.value.as_str())
            .collect()
    }
}

/// Failure classification for a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Uncaught script error, including parse failures and a missing `run`
    ScriptFault,

    /// The script returned non-empty text that is not valid JSON
    InvalidOutput,

    /// The run exceeded its wall-clock budget and was abandoned
    Timeout,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::ScriptFault => "script fault",
            FailureKind::InvalidOutput => "invalid output",
            FailureKind::Timeout => "timeout",
        };
        write!(f, "{}", name)
    }
}

/// Tagged outcome of one run. Produced only by the sandbox; consumed only by
/// the scheduler and publisher.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    /// The script produced a new JSON payload, kept byte-exact
    Success { payload: String },

    /// The script explicitly signalled nothing new
    NoChange,

    /// The run failed; the message is already redacted
    Failure { kind: FailureKind, message: String },
}

impl ExecutionResult {
    /// Shorthand constructor for failures
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        ExecutionResult::Failure {
            kind,
            message: message.into(),
        }
    }

    /// Whether this run produced a new payload
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success { .. })
    }

    /// Whether this run counts toward consecutive-failure backoff
    pub fn is_failure(&self) -> bool {
        matches!(self, ExecutionResult::Failure { .. })
    }
}
