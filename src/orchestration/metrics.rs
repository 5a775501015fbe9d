//! Read-side views produced by the orchestrator.
//!
//! Everything here is an owned snapshot; consumers never see live state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{Risk, Task, TaskId, TaskStatus, Wave};

/// Completion rates over trailing windows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityMetrics {
    pub completed_last_24h: usize,
    pub completed_last_7d: usize,
    /// Estimated hours of the tasks completed in the last 7 days.
    pub hours_delivered_last_7d: f64,
    pub tasks_per_day: f64,
}

impl VelocityMetrics {
    pub fn compute<'a, I>(tasks: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let day_ago = now - chrono::Duration::hours(24);
        let week_ago = now - chrono::Duration::days(7);

        let mut velocity = Self::default();
        for task in tasks {
            let Some(done) = task.completed_at else {
                continue;
            };
            if done >= day_ago {
                velocity.completed_last_24h += 1;
            }
            if done >= week_ago {
                velocity.completed_last_7d += 1;
                velocity.hours_delivered_last_7d += task.estimated_hours;
            }
        }
        velocity.tasks_per_day = velocity.completed_last_7d as f64 / 7.0;
        velocity
    }
}

/// Project-wide progress summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetrics {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub in_progress_tasks: usize,
    pub blocked_tasks: usize,
    /// Completed ÷ total × 100, or 0 for an empty project.
    pub overall_progress: f64,
    /// Now plus remaining estimated hours in whole working days.
    pub estimated_completion: DateTime<Utc>,
    pub current_risks: Vec<Risk>,
    pub velocity: VelocityMetrics,
    pub computed_at: DateTime<Utc>,
}

impl ProjectMetrics {
    pub fn compute<'a, T, R>(tasks: T, risks: R, hours_per_day: f64, now: DateTime<Utc>) -> Self
    where
        T: IntoIterator<Item = &'a Task>,
        R: IntoIterator<Item = &'a Risk>,
    {
        let tasks: Vec<&Task> = tasks.into_iter().collect();
        let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();

        let total_tasks = tasks.len();
        let completed_tasks = count(TaskStatus::Completed);
        let overall_progress = if total_tasks == 0 {
            0.0
        } else {
            completed_tasks as f64 / total_tasks as f64 * 100.0
        };

        let remaining_hours: f64 = tasks
            .iter()
            .filter(|t| !t.is_completed())
            .map(|t| t.estimated_hours)
            .sum();
        let days = if hours_per_day > 0.0 {
            (remaining_hours / hours_per_day).ceil() as i64
        } else {
            0
        };
        // Out-of-range estimates saturate at the latest representable instant.
        let estimated_completion = chrono::Duration::try_days(days)
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut current_risks: Vec<Risk> = risks
            .into_iter()
            .filter(|r| r.is_current())
            .cloned()
            .collect();
        current_risks.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.created_at.cmp(&b.created_at)));

        Self {
            total_tasks,
            completed_tasks,
            in_progress_tasks: count(TaskStatus::InProgress),
            blocked_tasks: count(TaskStatus::Blocked),
            overall_progress,
            estimated_completion,
            current_risks,
            velocity: VelocityMetrics::compute(tasks.iter().copied(), now),
            computed_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub id: TaskId,
    pub name: String,
    pub progress: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedEntry {
    pub id: TaskId,
    pub name: String,
    pub status: TaskStatus,
    pub blocked_by: Vec<TaskId>,
}

/// Daily standup view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandupSummary {
    /// Tasks completed in the trailing 24 hours.
    pub completed: Vec<ProgressEntry>,
    pub in_progress: Vec<ProgressEntry>,
    /// Tasks with `Blocked` status or a non-empty blocker set.
    pub blocked: Vec<BlockedEntry>,
}

/// A wave together with its tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveView {
    pub wave: Wave,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Dependency,
    Blocker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: TaskId,
    pub label: String,
    pub status: TaskStatus,
    pub wave: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: TaskId,
    pub to: TaskId,
    pub kind: EdgeKind,
}

/// Node/edge view of task relations for visualization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl DependencyGraph {
    pub fn from_tasks<'a, I>(tasks: I) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut graph = Self::default();
        for task in tasks {
            graph.nodes.push(GraphNode {
                id: task.id.clone(),
                label: task.name.clone(),
                status: task.status,
                wave: task.wave,
            });
            for dep in &task.dependencies {
                graph.edges.push(GraphEdge {
                    from: dep.clone(),
                    to: task.id.clone(),
                    kind: EdgeKind::Dependency,
                });
            }
            for blocker in &task.blocked_by {
                graph.edges.push(GraphEdge {
                    from: blocker.clone(),
                    to: task.id.clone(),
                    kind: EdgeKind::Blocker,
                });
            }
        }
        graph
    }
}

/// Composite read-only snapshot for dashboards and the execution monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    pub metrics: ProjectMetrics,
    pub waves: Vec<WaveView>,
    pub ready_tasks: Vec<Task>,
    pub critical_path: Vec<Task>,
    pub risks: Vec<Risk>,
    pub standup: StandupSummary,
    pub generated_at: DateTime<Utc>,
}

impl DashboardData {
    /// All tasks across waves, in wave order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.waves.iter().flat_map(|w| w.tasks.iter())
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks().find(|t| t.id.as_str() == id)
    }

    pub fn is_on_critical_path(&self, id: &TaskId) -> bool {
        self.critical_path.iter().any(|t| &t.id == id)
    }
}
