//! Orchestration layer.
//!
//! The [`Orchestrator`] owns the task/wave/risk model and answers readiness,
//! critical-path and progress queries. [`DashboardData`] is the composite
//! snapshot handed to presentation layers and the execution monitor.

mod metrics;
mod orchestrator;

pub use metrics::{
    BlockedEntry, DashboardData, DependencyGraph, EdgeKind, GraphEdge, GraphNode, ProgressEntry,
    ProjectMetrics, StandupSummary, VelocityMetrics, WaveView,
};
pub use orchestrator::Orchestrator;
