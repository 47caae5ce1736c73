//! Widget instance domain model

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier for a widget instance (newtype pattern for type safety)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WidgetId(pub Uuid);

impl WidgetId {
    /// Create a new random widget ID
    pub fn new() -> Self {
        WidgetId(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for WidgetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for WidgetId {
    fn from(uuid: Uuid) -> Self {
        WidgetId(uuid)
    }
}

impl From<WidgetId> for Uuid {
    fn from(id: WidgetId) -> Self {
        id.0
    }
}

/// One deployed, independently scheduled script-driven data source.
///
/// The script body is immutable for the lifetime of a registration; the
/// configuration map is the only part the engine allows to change in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetInstance {
    /// Unique identifier for the instance
    pub id: WidgetId,

    /// Human-readable name of the widget
    pub name: String,

    /// The script source, header declarations included
    pub script: String,

    /// How often the instance is scheduled for execution
    pub refresh_interval: Duration,

    /// Stored configuration values, keyed by declared variable name
    pub config: HashMap<String, String>,
}

impl WidgetInstance {
    /// Create a new widget instance with an empty configuration
    pub fn new(name: impl Into<String>, script: impl Into<String>, refresh_interval: Duration) -> Self {
        Self {
            id: WidgetId::new(),
            name: name.into(),
            script: script.into(),
            refresh_interval,
            config: HashMap::new(),
        }
    }

    /// Builder pattern for seeding configuration values
    pub fn with_config(mut self, config: HashMap<String, String>) -> Self {
        self.config = config;
        self
    }

    /// Builder pattern for setting a single configuration value
    pub fn with_config_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(name.into(), value.into());
        self
    }
}
