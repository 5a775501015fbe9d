//! Composite view published after every tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::bottleneck::BottleneckAlert;
use super::metrics::{AgentPerformance, ExecutionMetrics};
use crate::core::TaskId;
use crate::orchestration::{DashboardData, DependencyGraph};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringSnapshot {
    pub metrics: Option<ExecutionMetrics>,
    pub agent_performance: Vec<AgentPerformance>,
    pub active_bottlenecks: Vec<BottleneckAlert>,
    /// Agent type to the ids of its in-progress tasks.
    pub execution_map: BTreeMap<String, Vec<TaskId>>,
    pub dependency_graph: DependencyGraph,
    pub projected_completion: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
}

impl MonitoringSnapshot {
    pub fn build(
        data: &DashboardData,
        metrics: Option<ExecutionMetrics>,
        agent_performance: Vec<AgentPerformance>,
        active_bottlenecks: Vec<BottleneckAlert>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut execution_map: BTreeMap<String, Vec<TaskId>> = BTreeMap::new();
        for task in data.tasks().filter(|t| t.is_in_progress()) {
            execution_map
                .entry(task.agent_type.clone())
                .or_default()
                .push(task.id.clone());
        }

        let projected_completion = projected_completion(data, metrics.as_ref(), now);

        Self {
            metrics,
            agent_performance,
            active_bottlenecks,
            execution_map,
            dependency_graph: DependencyGraph::from_tasks(data.tasks()),
            projected_completion,
            generated_at: now,
        }
    }
}

/// Remaining tasks at the current hourly throughput, falling back to the
/// orchestrator's estimate when nothing completed recently.
fn projected_completion(
    data: &DashboardData,
    metrics: Option<&ExecutionMetrics>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let remaining = data
        .metrics
        .total_tasks
        .saturating_sub(data.metrics.completed_tasks);
    if remaining == 0 {
        return now;
    }
    match metrics {
        Some(m) if m.throughput > 0 => {
            let hours = remaining as f64 / m.throughput as f64;
            chrono::Duration::try_milliseconds((hours * 3_600_000.0) as i64)
                .and_then(|ahead| now.checked_add_signed(ahead))
                .unwrap_or(data.metrics.estimated_completion)
        }
        _ => data.metrics.estimated_completion,
    }
}
