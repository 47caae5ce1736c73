//! Engine lifecycle errors

use suri_core::{DeclarationError, WidgetId};
use thiserror::Error;

/// Errors raised by widget registration and lifecycle operations.
///
/// Tick outcomes are never errors; they resolve to an
/// [`suri_core::ExecutionResult`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// The script header failed to parse; the instance is unschedulable
    /// until its script is corrected
    #[error("invalid script header: {0}")]
    Declaration(#[from] DeclarationError),

    #[error("widget {0} is already registered")]
    DuplicateWidget(WidgetId),

    #[error("widget {0} is not registered")]
    UnknownWidget(WidgetId),

    #[error("widget {0} already has a run in flight")]
    AlreadyRunning(WidgetId),
}
