//! Dependency-aware orchestration of agent tasks organized into waves.
//!
//! [`Orchestrator`] owns the task, wave and risk model and answers readiness,
//! critical-path and progress queries. [`ExecutionMonitor`] polls it on a
//! timer, tracks execution metrics and raises bottleneck alerts.

pub mod config;
pub mod core;
pub mod error;
pub mod log;
pub mod monitor;
pub mod orchestration;

pub use config::Config;
pub use error::{Error, Result};
pub use monitor::ExecutionMonitor;
pub use orchestration::Orchestrator;
