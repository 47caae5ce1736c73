//! One-tick execution pipeline for a single widget instance

use crate::publish::Publisher;
use crate::state::InstanceState;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use suri_core::{
    resolve_variables, ExecutionContext, ExecutionResult, GlobalConfig, VariableDeclaration,
    WidgetId, WidgetInstance,
};
use suri_js::Sandbox;
use suri_store::ResultStore;
use tracing::{debug, warn};

/// Executes ticks for one widget instance.
///
/// The script body and its parsed declarations are immutable for the
/// lifetime of the runner; only the configuration map can change in place.
pub struct WidgetRunner {
    id: WidgetId,
    name: String,
    script: String,
    declarations: Vec<VariableDeclaration>,
    config: RwLock<HashMap<String, String>>,
    sandbox: Arc<Sandbox>,
    store: Arc<dyn ResultStore>,
    publisher: Arc<dyn Publisher>,
    globals: Arc<dyn GlobalConfig>,
    state: Arc<InstanceState>,
}

impl WidgetRunner {
    /// Create a runner for an instance whose declarations already parsed
    pub fn new(
        instance: WidgetInstance,
        declarations: Vec<VariableDeclaration>,
        sandbox: Arc<Sandbox>,
        store: Arc<dyn ResultStore>,
        publisher: Arc<dyn Publisher>,
        globals: Arc<dyn GlobalConfig>,
    ) -> Self {
        Self {
            id: instance.id,
            name: instance.name,
            script: instance.script,
            declarations,
            config: RwLock::new(instance.config),
            sandbox,
            store,
            publisher,
            globals,
            state: Arc::new(InstanceState::new()),
        }
    }

    /// The instance this runner executes
    pub fn id(&self) -> WidgetId {
        self.id
    }

    /// Human-readable widget name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The runner's state cell, shared with its driver task
    pub fn state(&self) -> &Arc<InstanceState> {
        &self.state
    }

    /// Replace the stored configuration values
    pub fn update_config(&self, config: HashMap<String, String>) {
        *self.config.write() = config;
    }

    /// Execute one tick: build the context, run the sandbox, apply the
    /// result. The caller owns the single-flight claim.
    pub async fn run_once(&self) -> ExecutionResult {
        let previous = self.store.get(&self.id).await.unwrap_or_default();
        let variables = {
            let config = self.config.read();
            resolve_variables(&self.declarations, &config, self.globals.as_ref())
        };
        let execution = ExecutionContext::new(self.id, variables, previous);

        let result = self.sandbox.execute(&self.script, execution).await;

        match &result {
            ExecutionResult::Success { payload } => {
                if self.state.is_stopped() {
                    // The instance was removed mid-run; the result vanishes
                    debug!("Discarding result of stopped widget {}", self.id);
                } else {
                    self.store.set(&self.id, payload.clone()).await;

                    let publisher = Arc::clone(&self.publisher);
                    let id = self.id;
                    let payload = payload.clone();
                    tokio::spawn(async move {
                        publisher.publish(id, &payload).await;
                    });
                }
            }
            ExecutionResult::NoChange => {
                debug!("Widget {} reported no change", self.id);
            }
            ExecutionResult::Failure { kind, message } => {
                // The message was redacted at the sandbox boundary
                warn!("Widget {} ({}) tick failed ({}): {}", self.id, self.name, kind, message);
            }
        }

        result
    }
}
