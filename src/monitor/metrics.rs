//! Time-series metrics derived from dashboard snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::config::MonitorConfig;
use crate::core::{Task, TaskStatus};
use crate::orchestration::DashboardData;
use crate::{Error, Result};

/// One collection tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    pub timestamp: DateTime<Utc>,
    /// Distinct agent types with at least one in-progress task.
    pub active_agent_types: Vec<String>,
    pub parallel_tasks: usize,
    /// Tasks completed within the throughput window.
    pub throughput: usize,
    /// Percentage of the assumed agent capacity in use, capped at 100.
    pub resource_utilization: f64,
    pub bottleneck_present: bool,
    /// Minutes by which in-progress critical-path tasks overran their estimates.
    pub critical_path_delay_minutes: f64,
}

impl ExecutionMetrics {
    pub fn collect(
        data: &DashboardData,
        config: &MonitorConfig,
        bottleneck_present: bool,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if config.max_parallel_capacity == 0 {
            return Err(Error::Validation(
                "max_parallel_capacity must be positive".to_string(),
            ));
        }

        let in_progress: Vec<&Task> = data.tasks().filter(|t| t.is_in_progress()).collect();
        let active_agent_types: BTreeSet<&str> =
            in_progress.iter().map(|t| t.agent_type.as_str()).collect();

        let window_start = now - config.throughput_window();
        let throughput = data
            .tasks()
            .filter(|t| t.completed_at.is_some_and(|at| at >= window_start && at <= now))
            .count();

        let utilization =
            in_progress.len() as f64 / config.max_parallel_capacity as f64 * 100.0;

        let critical_path_delay_minutes = in_progress
            .iter()
            .filter(|t| data.is_on_critical_path(&t.id))
            .filter_map(|t| {
                let elapsed = t.elapsed_hours(now)?;
                (elapsed > t.estimated_hours).then(|| (elapsed - t.estimated_hours) * 60.0)
            })
            .sum();

        Ok(Self {
            timestamp: now,
            active_agent_types: active_agent_types.into_iter().map(String::from).collect(),
            parallel_tasks: in_progress.len(),
            throughput,
            resource_utilization: utilization.min(100.0),
            bottleneck_present,
            critical_path_delay_minutes,
        })
    }

    pub fn active_agent_count(&self) -> usize {
        self.active_agent_types.len()
    }
}

/// Per-agent-type performance at one collection tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPerformance {
    pub agent_type: String,
    pub timestamp: DateTime<Utc>,
    pub completions: usize,
    /// Mean of actual hours (estimate when unknown) over completed tasks.
    pub avg_completion_hours: f64,
    /// Completed ÷ assigned × 100.
    pub success_rate: f64,
    /// Tasks currently in progress.
    pub current_load: usize,
    /// Mean estimated ÷ actual over completions; 1.0 when unknown.
    pub efficiency: f64,
}

impl AgentPerformance {
    /// One entry per agent type present in the snapshot, sorted by type.
    pub fn collect(data: &DashboardData, now: DateTime<Utc>) -> Vec<Self> {
        let mut by_type: BTreeMap<&str, Vec<&Task>> = BTreeMap::new();
        for task in data.tasks() {
            by_type.entry(task.agent_type.as_str()).or_default().push(task);
        }

        by_type
            .into_iter()
            .map(|(agent_type, tasks)| Self::for_tasks(agent_type, &tasks, now))
            .collect()
    }

    fn for_tasks(agent_type: &str, tasks: &[&Task], now: DateTime<Utc>) -> Self {
        let completed: Vec<&&Task> = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .collect();
        let completions = completed.len();

        let (avg_completion_hours, efficiency) = if completions == 0 {
            (0.0, 1.0)
        } else {
            let hours: f64 = completed.iter().map(|t| t.effective_hours()).sum();
            let ratios: f64 = completed
                .iter()
                .map(|t| match t.actual_hours {
                    Some(actual) if actual > 0.0 && t.estimated_hours > 0.0 => {
                        t.estimated_hours / actual
                    }
                    _ => 1.0,
                })
                .sum();
            (hours / completions as f64, ratios / completions as f64)
        };

        Self {
            agent_type: agent_type.to_string(),
            timestamp: now,
            completions,
            avg_completion_hours,
            success_rate: completions as f64 / tasks.len() as f64 * 100.0,
            current_load: tasks.iter().filter(|t| t.is_in_progress()).count(),
            efficiency,
        }
    }
}

pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Timestamped for ExecutionMetrics {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl Timestamped for AgentPerformance {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Append-only series that forgets entries older than its retention window.
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: VecDeque<T>,
    retention: chrono::Duration,
}

impl<T: Timestamped + Clone> History<T> {
    pub fn new(retention: chrono::Duration) -> Self {
        Self {
            entries: VecDeque::new(),
            retention,
        }
    }

    /// Append and drop everything older than `now - retention`.
    pub fn record(&mut self, entry: T, now: DateTime<Utc>) {
        self.entries.push_back(entry);
        self.prune(now);
    }

    pub fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.retention;
        while self.entries.front().is_some_and(|e| e.timestamp() < cutoff) {
            self.entries.pop_front();
        }
    }

    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn latest_mut(&mut self) -> Option<&mut T> {
        self.entries.back_mut()
    }

    pub fn oldest(&self) -> Option<&T> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}
