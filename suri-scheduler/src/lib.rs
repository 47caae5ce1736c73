//! Per-widget scheduling and engine assembly
//!
//! One timer task per widget instance, a bounded worker pool across
//! instances, single-flight execution per instance, and the publisher
//! boundary toward the dashboard state layer.

pub mod engine;
pub mod error;
pub mod publish;
pub mod runner;
pub mod state;

pub use engine::WidgetEngine;
pub use error::EngineError;
pub use publish::{ChannelPublisher, LogPublisher, Publisher};
pub use runner::WidgetRunner;
pub use state::{InstanceState, RunState};
