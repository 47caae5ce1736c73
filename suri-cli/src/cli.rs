//! CLI argument parsing definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "suri", author, version, about = "Suri widget script engine", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Schedule and run every widget in a dashboard directory
    Run {
        /// Directory containing one subdirectory per widget
        #[arg(long, value_name = "PATH")]
        dashboard: PathBuf,
    },

    /// Execute a single widget directory once and print the result
    Exec {
        /// Path to the widget directory
        #[arg(value_name = "PATH")]
        widget: PathBuf,
    },

    /// Validate the script headers of every widget in a dashboard directory
    Validate {
        /// Directory containing one subdirectory per widget
        #[arg(value_name = "PATH")]
        dashboard: PathBuf,
    },

    /// Print a sample configuration file
    GenerateConfig,
}
