//! Bottleneck detection rules and the active-alert table.
//!
//! Each rule produces candidate alerts keyed by a deterministic condition id.
//! The [`BottleneckTracker`] resolves stale alerts first, then admits
//! candidates whose key is not already active, so an ongoing condition is
//! reported once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::metrics::{AgentPerformance, ExecutionMetrics};
use crate::config::MonitorConfig;
use crate::core::{Severity, TaskId, TaskStatus};
use crate::orchestration::DashboardData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BottleneckType {
    DependencyChain,
    ResourceConstraint,
    CriticalPathDelay,
    AgentOverload,
}

impl std::fmt::Display for BottleneckType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BottleneckType::DependencyChain => "dependency_chain",
            BottleneckType::ResourceConstraint => "resource_constraint",
            BottleneckType::CriticalPathDelay => "critical_path_delay",
            BottleneckType::AgentOverload => "agent_overload",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleneckAlert {
    /// Condition key, e.g. `dep-chain-<task>` or `agent-overload-<type>`.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BottleneckType,
    pub severity: Severity,
    pub description: String,
    pub affected_tasks: Vec<TaskId>,
    /// Set for agent-overload alerts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<String>,
    pub suggested_actions: Vec<String>,
    pub detected_at: DateTime<Utc>,
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Inputs shared by detection rules and resolution predicates.
pub struct DetectionContext<'a> {
    pub data: &'a DashboardData,
    pub metrics: &'a ExecutionMetrics,
    pub performance: &'a [AgentPerformance],
    pub config: &'a MonitorConfig,
    pub now: DateTime<Utc>,
}

impl DetectionContext<'_> {
    fn load_of(&self, agent_type: &str) -> usize {
        self.performance
            .iter()
            .find(|p| p.agent_type == agent_type)
            .map(|p| p.current_load)
            .unwrap_or(0)
    }

    fn dependency_done(&self, id: &TaskId) -> bool {
        self.data
            .task(id.as_str())
            .is_some_and(|t| t.status == TaskStatus::Completed)
    }
}

impl BottleneckAlert {
    fn new(
        id: String,
        kind: BottleneckType,
        severity: Severity,
        description: String,
        affected_tasks: Vec<TaskId>,
        suggested_actions: &[&str],
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            severity,
            description,
            affected_tasks,
            agent_type: None,
            suggested_actions: suggested_actions.iter().map(|s| s.to_string()).collect(),
            detected_at: now,
            resolved: false,
            resolved_at: None,
        }
    }

    /// Whether the condition that raised this alert has cleared.
    pub fn is_resolved(&self, ctx: &DetectionContext<'_>) -> bool {
        match self.kind {
            BottleneckType::ResourceConstraint => {
                ctx.metrics.resource_utilization < ctx.config.resource_resolve_pct
            }
            BottleneckType::CriticalPathDelay => self.affected_tasks.iter().all(|id| {
                ctx.data
                    .task(id.as_str())
                    .map(|t| t.status == TaskStatus::Completed)
                    .unwrap_or(true)
            }),
            BottleneckType::AgentOverload => {
                let agent_type = self.agent_type.as_deref().unwrap_or_default();
                ctx.load_of(agent_type) <= ctx.config.overload_resolve
            }
            BottleneckType::DependencyChain => self.affected_tasks.iter().all(|id| {
                match ctx.data.task(id.as_str()) {
                    Some(task) => {
                        task.status != TaskStatus::Pending
                            || task.dependencies.iter().all(|d| ctx.dependency_done(d))
                    }
                    None => true,
                }
            }),
        }
    }
}

// ========== Detection Rules ==========

/// Run all four rules and return every alert whose condition holds now.
pub fn detect(ctx: &DetectionContext<'_>) -> Vec<BottleneckAlert> {
    let mut alerts = dependency_chains(ctx);
    alerts.extend(resource_constraint(ctx));
    alerts.extend(critical_path_delays(ctx));
    alerts.extend(agent_overloads(ctx));
    alerts
}

fn dependency_chains(ctx: &DetectionContext<'_>) -> Vec<BottleneckAlert> {
    ctx.data
        .tasks()
        .filter(|t| t.status == TaskStatus::Pending)
        .filter_map(|task| {
            let waiting: Vec<&TaskId> = task
                .dependencies
                .iter()
                .filter(|d| !ctx.dependency_done(d))
                .collect();
            if waiting.is_empty() {
                return None;
            }
            let names: Vec<&str> = waiting.iter().map(|d| d.as_str()).collect();
            Some(BottleneckAlert::new(
                format!("dep-chain-{}", task.id),
                BottleneckType::DependencyChain,
                Severity::Medium,
                format!("Task {} is waiting on {}", task.id, names.join(", ")),
                vec![task.id.clone()],
                &[
                    "Prioritize completion of the blocking dependencies",
                    "Review whether every dependency is necessary",
                    "Consider starting independent work in parallel",
                ],
                ctx.now,
            ))
        })
        .collect()
}

fn resource_constraint(ctx: &DetectionContext<'_>) -> Option<BottleneckAlert> {
    let utilization = ctx.metrics.resource_utilization;
    if utilization <= ctx.config.resource_alert_pct {
        return None;
    }
    let affected = ctx
        .data
        .tasks()
        .filter(|t| t.is_in_progress())
        .map(|t| t.id.clone())
        .collect();
    Some(BottleneckAlert::new(
        "resource-constraint-general".to_string(),
        BottleneckType::ResourceConstraint,
        Severity::High,
        format!("Agent capacity at {:.0}% utilization", utilization),
        affected,
        &[
            "Defer starting new tasks until capacity frees up",
            "Increase the number of available agents",
            "Review in-progress work for tasks that can be paused",
        ],
        ctx.now,
    ))
}

fn critical_path_delays(ctx: &DetectionContext<'_>) -> Vec<BottleneckAlert> {
    ctx.data
        .critical_path
        .iter()
        .filter(|t| t.is_in_progress())
        .filter_map(|task| {
            let elapsed = task.elapsed_hours(ctx.now)?;
            let limit = task.estimated_hours * ctx.config.critical_delay_ratio;
            if elapsed <= limit {
                return None;
            }
            Some(BottleneckAlert::new(
                format!("critical-delay-{}", task.id),
                BottleneckType::CriticalPathDelay,
                Severity::Critical,
                format!(
                    "Critical-path task {} has run {:.1}h against a {:.1}h estimate",
                    task.id, elapsed, task.estimated_hours
                ),
                vec![task.id.clone()],
                &[
                    "Assign additional agents to the delayed task",
                    "Split the remaining work into smaller tasks",
                    "Re-plan downstream waves around the delay",
                ],
                ctx.now,
            ))
        })
        .collect()
}

fn agent_overloads(ctx: &DetectionContext<'_>) -> Vec<BottleneckAlert> {
    ctx.performance
        .iter()
        .filter(|p| p.current_load > ctx.config.overload_threshold)
        .map(|perf| {
            let affected = ctx
                .data
                .tasks()
                .filter(|t| t.is_in_progress() && t.agent_type == perf.agent_type)
                .map(|t| t.id.clone())
                .collect();
            let mut alert = BottleneckAlert::new(
                format!("agent-overload-{}", perf.agent_type),
                BottleneckType::AgentOverload,
                Severity::Medium,
                format!(
                    "Agent type {} has {} tasks in progress",
                    perf.agent_type, perf.current_load
                ),
                affected,
                &[
                    "Redistribute tasks to other agent types",
                    "Queue new work for this agent type until load drops",
                ],
                ctx.now,
            );
            alert.agent_type = Some(perf.agent_type.clone());
            alert
        })
        .collect()
}

// ========== Tracker ==========

/// Active alerts keyed by condition id, plus those resolved within retention.
#[derive(Debug, Clone, Default)]
pub struct BottleneckTracker {
    active: BTreeMap<String, BottleneckAlert>,
    resolved: Vec<BottleneckAlert>,
}

impl BottleneckTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retire every active alert whose condition has cleared.
    pub fn resolve(&mut self, ctx: &DetectionContext<'_>) -> Vec<BottleneckAlert> {
        let cleared: Vec<String> = self
            .active
            .values()
            .filter(|alert| alert.is_resolved(ctx))
            .map(|alert| alert.id.clone())
            .collect();

        let mut resolved = Vec::with_capacity(cleared.len());
        for key in cleared {
            if let Some(mut alert) = self.active.remove(&key) {
                alert.resolved = true;
                alert.resolved_at = Some(ctx.now);
                self.resolved.push(alert.clone());
                resolved.push(alert);
            }
        }
        resolved
    }

    /// Admit candidates whose key is not already active. Returns the new ones.
    pub fn admit(&mut self, candidates: Vec<BottleneckAlert>) -> Vec<BottleneckAlert> {
        let mut admitted = Vec::new();
        for alert in candidates {
            if self.active.contains_key(&alert.id) {
                continue;
            }
            self.active.insert(alert.id.clone(), alert.clone());
            admitted.push(alert);
        }
        admitted
    }

    /// Active alerts, most severe first.
    pub fn active(&self) -> Vec<BottleneckAlert> {
        let mut alerts: Vec<BottleneckAlert> = self.active.values().cloned().collect();
        alerts.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(a.detected_at.cmp(&b.detected_at))
                .then(a.id.cmp(&b.id))
        });
        alerts
    }

    pub fn resolved(&self) -> &[BottleneckAlert] {
        &self.resolved
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.active.contains_key(key)
    }

    pub fn has_active(&self) -> bool {
        !self.active.is_empty()
    }

    pub fn prune_resolved(&mut self, cutoff: DateTime<Utc>) {
        self.resolved
            .retain(|a| a.resolved_at.is_some_and(|at| at >= cutoff));
    }
}
