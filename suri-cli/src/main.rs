use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use suri_config::{ConfigLoader, LogFormat, LoggingConfig, SuriConfig};
use suri_core::{parse_declarations, ExecutionResult};
use suri_http::HttpManager;
use suri_scheduler::{ChannelPublisher, EngineError, WidgetEngine};
use suri_store::InMemoryResultStore;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod cli;
mod dashboard;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loader = ConfigLoader::new();
    let mut config = loader
        .load(cli.config.as_ref())
        .context("Failed to load configuration")?;

    if let Some(level) = &cli.log_level {
        config.logging.level = level
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid --log-level: {}", e))?;
    }

    init_tracing(&config.logging);

    match cli.command {
        Commands::Run { dashboard } => run_dashboard(&config, &dashboard).await,
        Commands::Exec { widget } => exec_widget(&config, &widget).await,
        Commands::Validate { dashboard } => validate_dashboard(&config, &dashboard),
        Commands::GenerateConfig => {
            print!("{}", SuriConfig::generate_sample());
            Ok(())
        }
    }
}

/// Initialize the tracing subscriber from logging configuration.
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    match config.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Build the engine with its collaborators wired up
fn build_engine(
    config: &SuriConfig,
) -> Result<(WidgetEngine, tokio::sync::mpsc::UnboundedReceiver<(suri_core::WidgetId, String)>)> {
    let http = Arc::new(
        HttpManager::with_config(config.http.clone()).context("Failed to create HTTP client")?,
    );
    let store = Arc::new(InMemoryResultStore::new());
    let (publisher, updates) = ChannelPublisher::new();

    let engine = WidgetEngine::new(config, http, store, Arc::new(publisher));
    Ok((engine, updates))
}

/// Schedule every widget in the dashboard directory and stream payloads
/// until interrupted
async fn run_dashboard(config: &SuriConfig, dashboard_dir: &Path) -> Result<()> {
    let instances =
        dashboard::load_dashboard(dashboard_dir, config.scheduler.default_refresh_interval)?;
    anyhow::ensure!(
        !instances.is_empty(),
        "No widgets found under {}",
        dashboard_dir.display()
    );

    let (engine, mut updates) = build_engine(config)?;

    for instance in instances {
        let name = instance.name.clone();
        let id = instance.id;
        match engine.register(instance) {
            Ok(_) => {}
            Err(EngineError::Declaration(e)) => {
                // Reported and skipped; the rest of the dashboard still runs
                error!("Widget '{}' ({}) is unschedulable: {}", name, id, e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        "Engine running with {} scheduled widgets, press Ctrl-C to stop",
        engine.widget_ids().len()
    );

    loop {
        tokio::select! {
            Some((id, payload)) = updates.recv() => {
                println!("{}\t{}", id, payload);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, shutting down");
                break;
            }
        }
    }

    engine.shutdown().await;
    Ok(())
}

/// Execute one widget directory once and print its result
async fn exec_widget(config: &SuriConfig, widget_dir: &Path) -> Result<()> {
    let instance =
        dashboard::load_widget(widget_dir, config.scheduler.default_refresh_interval)?;
    let (engine, _updates) = build_engine(config)?;

    match engine.execute_once(instance).await? {
        ExecutionResult::Success { payload } => {
            println!("{}", payload);
            Ok(())
        }
        ExecutionResult::NoChange => {
            println!("(no change)");
            Ok(())
        }
        ExecutionResult::Failure { kind, message } => {
            anyhow::bail!("execution failed ({}): {}", kind, message)
        }
    }
}

/// Parse every widget header in the dashboard and report the outcome
fn validate_dashboard(config: &SuriConfig, dashboard_dir: &Path) -> Result<()> {
    let instances =
        dashboard::load_dashboard(dashboard_dir, config.scheduler.default_refresh_interval)?;

    let mut failures = 0usize;
    for instance in &instances {
        match parse_declarations(&instance.script) {
            Ok(declarations) => {
                println!("ok: {} ({} variables)", instance.name, declarations.len());
            }
            Err(e) => {
                failures += 1;
                println!("error: {}: {}", instance.name, e);
            }
        }
    }

    anyhow::ensure!(failures == 0, "{} widget(s) failed validation", failures);
    Ok(())
}
