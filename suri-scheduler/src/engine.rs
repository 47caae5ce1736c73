//! Widget engine: registration, timers, and lifecycle
//!
//! The engine owns one driver task per registered widget instance. Drivers
//! tick on the instance's refresh interval, enforce single-flight through
//! the instance state cell, and share a bounded pool of execution slots.

use crate::error::EngineError;
use crate::publish::Publisher;
use crate::runner::WidgetRunner;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use suri_config::{BackoffConfig, SchedulerConfig, SuriConfig};
use suri_core::{
    parse_declarations, DeclarationError, ExecutionResult, GlobalConfig, StaticGlobalConfig,
    WidgetId, WidgetInstance,
};
use suri_http::HttpClient;
use suri_js::Sandbox;
use suri_store::ResultStore;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Handle to one scheduled widget instance
struct WidgetHandle {
    runner: Arc<WidgetRunner>,
    stop: watch::Sender<bool>,
    driver: JoinHandle<()>,
}

/// The widget script execution engine
pub struct WidgetEngine {
    sandbox: Arc<Sandbox>,
    store: Arc<dyn ResultStore>,
    publisher: Arc<dyn Publisher>,
    globals: Arc<dyn GlobalConfig>,
    config: SchedulerConfig,
    slots: Arc<Semaphore>,
    widgets: Mutex<HashMap<WidgetId, WidgetHandle>>,
    unschedulable: Mutex<HashMap<WidgetId, DeclarationError>>,
}

impl WidgetEngine {
    /// Create an engine from configuration and its collaborators
    pub fn new(
        config: &SuriConfig,
        http: Arc<dyn HttpClient>,
        store: Arc<dyn ResultStore>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        info!(
            "Creating widget engine with {} execution slots",
            config.scheduler.max_concurrent_runs
        );
        Self {
            sandbox: Arc::new(Sandbox::new(config.sandbox.clone(), http)),
            store,
            publisher,
            globals: Arc::new(StaticGlobalConfig::new(config.globals.clone())),
            config: config.scheduler.clone(),
            slots: Arc::new(Semaphore::new(config.scheduler.max_concurrent_runs)),
            widgets: Mutex::new(HashMap::new()),
            unschedulable: Mutex::new(HashMap::new()),
        }
    }

    /// Register a widget instance and start its timer.
    ///
    /// A header that fails to parse leaves the instance unschedulable: the
    /// error is retained for the operator and no timer is started.
    pub fn register(&self, instance: WidgetInstance) -> Result<WidgetId, EngineError> {
        let id = instance.id;

        if self.widgets.lock().contains_key(&id) {
            return Err(EngineError::DuplicateWidget(id));
        }

        let declarations = match parse_declarations(&instance.script) {
            Ok(declarations) => declarations,
            Err(e) => {
                error!("Widget {} ({}) is unschedulable: {}", id, instance.name, e);
                self.unschedulable.lock().insert(id, e.clone());
                return Err(EngineError::Declaration(e));
            }
        };
        self.unschedulable.lock().remove(&id);

        let interval = if instance.refresh_interval.is_zero() {
            self.config.default_refresh_interval
        } else {
            instance.refresh_interval
        };

        let runner = Arc::new(WidgetRunner::new(
            instance,
            declarations,
            Arc::clone(&self.sandbox),
            Arc::clone(&self.store),
            Arc::clone(&self.publisher),
            Arc::clone(&self.globals),
        ));

        let (stop_tx, stop_rx) = watch::channel(false);
        let driver = tokio::spawn(drive(
            Arc::clone(&runner),
            interval,
            Arc::clone(&self.slots),
            self.config.backoff.clone(),
            stop_rx,
        ));

        self.widgets.lock().insert(
            id,
            WidgetHandle {
                runner,
                stop: stop_tx,
                driver,
            },
        );

        info!("Registered widget {} with {:?} refresh interval", id, interval);
        Ok(id)
    }

    /// Remove an instance. An in-flight run is allowed to finish, but its
    /// result is discarded; the stored payload is dropped with the instance.
    pub async fn remove(&self, id: WidgetId) -> Result<(), EngineError> {
        let handle = self.widgets.lock().remove(&id);

        let Some(handle) = handle else {
            if self.unschedulable.lock().remove(&id).is_some() {
                return Ok(());
            }
            return Err(EngineError::UnknownWidget(id));
        };

        handle.runner.state().stop();
        let _ = handle.stop.send(true);
        let _ = handle.driver.await;

        self.store.remove(&id).await;
        info!("Removed widget {}", id);
        Ok(())
    }

    /// Replace an instance's stored configuration; the next tick resolves
    /// against the new values
    pub fn update_config(
        &self,
        id: WidgetId,
        config: HashMap<String, String>,
    ) -> Result<(), EngineError> {
        let widgets = self.widgets.lock();
        let handle = widgets.get(&id).ok_or(EngineError::UnknownWidget(id))?;
        handle.runner.update_config(config);
        Ok(())
    }

    /// Execute one exclusive tick immediately, bypassing the timer but not
    /// the single-flight invariant
    pub async fn run_once(&self, id: WidgetId) -> Result<ExecutionResult, EngineError> {
        let runner = self
            .widgets
            .lock()
            .get(&id)
            .map(|handle| Arc::clone(&handle.runner))
            .ok_or(EngineError::UnknownWidget(id))?;

        if !runner.state().try_claim() {
            return Err(EngineError::AlreadyRunning(id));
        }

        let result = runner.run_once().await;
        runner.state().release();
        Ok(result)
    }

    /// Execute an unregistered instance exactly once, without scheduling it.
    /// Used by one-shot tooling.
    pub async fn execute_once(
        &self,
        instance: WidgetInstance,
    ) -> Result<ExecutionResult, EngineError> {
        let declarations = parse_declarations(&instance.script)?;
        let runner = WidgetRunner::new(
            instance,
            declarations,
            Arc::clone(&self.sandbox),
            Arc::clone(&self.store),
            Arc::clone(&self.publisher),
            Arc::clone(&self.globals),
        );
        Ok(runner.run_once().await)
    }

    /// Currently scheduled widget ids
    pub fn widget_ids(&self) -> Vec<WidgetId> {
        self.widgets.lock().keys().copied().collect()
    }

    /// The declaration error that left an instance unschedulable, if any
    pub fn declaration_error(&self, id: &WidgetId) -> Option<DeclarationError> {
        self.unschedulable.lock().get(id).cloned()
    }

    /// Ticks dropped for an instance because a run was already in flight
    pub fn dropped_ticks(&self, id: &WidgetId) -> Result<u64, EngineError> {
        let widgets = self.widgets.lock();
        let handle = widgets.get(&id).ok_or(EngineError::UnknownWidget(*id))?;
        Ok(handle.runner.state().dropped_ticks())
    }

    /// Stop every driver and wait for them to exit
    pub async fn shutdown(&self) {
        let handles: Vec<WidgetHandle> = {
            let mut widgets = self.widgets.lock();
            widgets.drain().map(|(_, handle)| handle).collect()
        };

        for handle in &handles {
            handle.runner.state().stop();
            let _ = handle.stop.send(true);
        }
        for handle in handles {
            let _ = handle.driver.await;
        }

        info!("Engine shut down");
    }
}

/// Driver loop for one widget instance
async fn drive(
    runner: Arc<WidgetRunner>,
    interval: Duration,
    slots: Arc<Semaphore>,
    backoff: BackoffConfig,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    // A tick that lands while a run is in flight is dropped, not queued
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut consecutive_failures: u32 = 0;
    let mut resume_at: Option<Instant> = None;

    debug!("Starting driver for widget {}", runner.id());

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = stop.changed() => break,
        }

        if runner.state().is_stopped() {
            break;
        }

        if let Some(at) = resume_at {
            if Instant::now() < at {
                debug!("Widget {} is backing off, skipping tick", runner.id());
                continue;
            }
        }

        if !runner.state().try_claim() {
            let dropped = runner.state().record_dropped_tick();
            debug!("Dropped tick {} for busy widget {}", dropped, runner.id());
            continue;
        }

        let permit = tokio::select! {
            permit = slots.acquire() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    runner.state().release();
                    break;
                }
            },
            _ = stop.changed() => {
                runner.state().release();
                break;
            }
        };

        let result = runner.run_once().await;
        drop(permit);
        runner.state().release();

        if result.is_failure() {
            consecutive_failures += 1;
            if backoff.enabled {
                let delay = backoff_delay(interval, consecutive_failures, backoff.max_interval);
                debug!(
                    "Widget {} backing off {:?} after {} consecutive failures",
                    runner.id(),
                    delay,
                    consecutive_failures
                );
                resume_at = Some(Instant::now() + delay);
            }
        } else {
            consecutive_failures = 0;
            resume_at = None;
        }
    }

    debug!("Driver for widget {} exited", runner.id());
}

/// Doubling delay from the refresh interval, capped
fn backoff_delay(interval: Duration, consecutive_failures: u32, cap: Duration) -> Duration {
    let factor = 2u32.saturating_pow(consecutive_failures.min(16));
    interval.saturating_mul(factor).min(cap)
}
