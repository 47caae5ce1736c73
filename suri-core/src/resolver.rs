//! Three-layer variable resolution
//!
//! A variable resolves from, in order: the instance-level stored value, the
//! header-declared default, and — for variables flagged as global — the
//! global configuration layer.

use crate::variables::{ResolvedVariable, VariableDeclaration};
use std::collections::HashMap;
use tracing::debug;

/// Read access to the global/secret configuration layer.
///
/// The backing store is an external collaborator; the engine only ever reads
/// from it, and only for variables whose declared type opts into the layer.
pub trait GlobalConfig: Send + Sync {
    /// Look up a globally configured value by variable name
    fn get(&self, name: &str) -> Option<String>;
}

/// Map-backed [`GlobalConfig`] implementation
#[derive(Debug, Clone, Default)]
pub struct StaticGlobalConfig {
    values: HashMap<String, String>,
}

impl StaticGlobalConfig {
    /// Create a global layer from a name → value map
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Empty global layer
    pub fn empty() -> Self {
        Self::default()
    }
}

impl GlobalConfig for StaticGlobalConfig {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

/// Resolve declared variables against the instance configuration and the
/// global layer, preserving declaration order.
///
/// Only variable names are logged here; resolved values never are, since
/// any of them may be sensitive.
pub fn resolve_variables(
    declarations: &[VariableDeclaration],
    instance_config: &HashMap<String, String>,
    globals: &dyn GlobalConfig,
) -> Vec<ResolvedVariable> {
    let resolved: Vec<ResolvedVariable> = declarations
        .iter()
        .map(|declaration| {
            let value = if let Some(stored) = instance_config.get(&declaration.name) {
                stored.clone()
            } else if !declaration.default_value.is_empty() {
                declaration.default_value.clone()
            } else if declaration.value_type.is_global() {
                globals.get(&declaration.name).unwrap_or_default()
            } else {
                declaration.default_value.clone()
            };

            ResolvedVariable {
                name: declaration.name.clone(),
                value,
                value_type: declaration.value_type,
                sensitive: declaration.value_type.is_sensitive(),
            }
        })
        .collect();

    debug!(
        "Resolved {} variables: [{}]",
        resolved.len(),
        resolved
            .iter()
            .map(|v| v.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    resolved
}
