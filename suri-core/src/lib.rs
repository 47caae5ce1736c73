//! Core domain model for the Suri widget script engine
//!
//! This crate defines the widget instance model, the script variable
//! declaration protocol, the three-layer variable resolver, and the
//! execution result types shared by the sandbox and the scheduler.

pub mod execution;
pub mod redact;
pub mod resolver;
pub mod variables;
pub mod widget;

// Re-export main types for convenience
pub use execution::{ExecutionContext, ExecutionResult, FailureKind};
pub use redact::redact_sensitive;
pub use resolver::{resolve_variables, GlobalConfig, StaticGlobalConfig};
pub use variables::{
    parse_declarations, DeclarationError, ResolvedVariable, VariableDeclaration, VariableType,
};
pub use widget::{WidgetId, WidgetInstance};
