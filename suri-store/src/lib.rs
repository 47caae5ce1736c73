//! Per-widget result store
//!
//! Holds, for each widget instance, the JSON payload of its last successful
//! execution. Overwritten atomically on each new success; untouched by
//! `NoChange`, failures, and abandoned runs. The scheduler's single-flight
//! guarantee means at most one writer per instance, so a plain read-write
//! lock over the map is sufficient.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use suri_core::WidgetId;
use tracing::debug;

/// Store of last-success payloads, keyed by widget instance
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// The last successful payload for an instance, if any
    async fn get(&self, id: &WidgetId) -> Option<String>;

    /// Overwrite the instance's payload. No history is retained.
    async fn set(&self, id: &WidgetId, payload: String);

    /// Drop the entry when the instance is removed
    async fn remove(&self, id: &WidgetId);
}

/// Simple in-memory result store
#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    entries: Arc<RwLock<HashMap<WidgetId, String>>>,
}

impl InMemoryResultStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instances with a stored payload
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds no payloads
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn get(&self, id: &WidgetId) -> Option<String> {
        self.entries.read().get(id).cloned()
    }

    async fn set(&self, id: &WidgetId, payload: String) {
        debug!("Storing {} byte payload for widget {}", payload.len(), id);
        self.entries.write().insert(*id, payload);
    }

    async fn remove(&self, id: &WidgetId) {
        debug!("Removing stored payload for widget {}", id);
        self.entries.write().remove(id);
    }
}
