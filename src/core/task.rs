//! Task data model.
//!
//! A task is a unit of work assigned to an agent capability. Its lifecycle
//! fields (status, progress, timestamps) only change through
//! [`Task::apply_status`], which keeps them mutually consistent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Stable identifier for a task, defined by the project plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::borrow::Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Task status in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started; may or may not have its dependencies satisfied.
    #[default]
    Pending,
    /// An agent is working on the task.
    InProgress,
    /// Terminal success.
    Completed,
    /// Explicitly blocked and cannot proceed.
    Blocked,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Blocked => write!(f, "blocked"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

/// A unit of work assigned to an agent type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Capability tag of the executor this task is assigned to.
    pub agent_type: String,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    /// Execution phase. Fixed at creation.
    pub wave: u32,
    /// Tasks that must be completed before this one may start.
    pub dependencies: BTreeSet<TaskId>,
    /// Active blocking relationships, cleared once unblocked.
    pub blocked_by: BTreeSet<TaskId>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
    pub estimated_hours: f64,
    pub actual_hours: Option<f64>,
    pub deliverables: Vec<String>,
    pub risk_level: RiskLevel,
    /// 0-100. Equals 100 exactly when the task is completed.
    pub progress: u8,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Task {
    /// Create a pending task with no dependencies.
    pub fn new(id: impl Into<TaskId>, agent_type: &str, wave: u32, estimated_hours: f64) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            agent_type: agent_type.to_string(),
            description: String::new(),
            status: TaskStatus::Pending,
            priority: Priority::Normal,
            wave,
            dependencies: BTreeSet::new(),
            blocked_by: BTreeSet::new(),
            started_at: None,
            completed_at: None,
            last_updated: Utc::now(),
            estimated_hours,
            actual_hours: None,
            deliverables: Vec::new(),
            risk_level: RiskLevel::Low,
            progress: 0,
            metadata: BTreeMap::new(),
        }
    }

    /// Builder-style dependency addition.
    pub fn depends_on(mut self, id: impl Into<TaskId>) -> Self {
        self.dependencies.insert(id.into());
        self
    }

    /// Apply a status transition at `now`.
    ///
    /// - First entry into `InProgress` stamps `started_at`; later entries keep it.
    /// - First entry into `Completed` stamps `completed_at`; repeats keep it.
    /// - Leaving `Completed` clears `completed_at`.
    /// - `progress` overwrites the current value, except that completion
    ///   forces 100 and any other status is capped at 99.
    pub fn apply_status(&mut self, status: TaskStatus, progress: Option<u8>, now: DateTime<Utc>) {
        self.status = status;
        self.last_updated = now;

        if let Some(p) = progress {
            self.progress = p.min(100);
        }

        match status {
            TaskStatus::InProgress => {
                if self.started_at.is_none() {
                    self.started_at = Some(now);
                }
            }
            TaskStatus::Completed => {
                if self.completed_at.is_none() {
                    self.completed_at = Some(now);
                }
            }
            TaskStatus::Pending | TaskStatus::Blocked => {}
        }

        if status == TaskStatus::Completed {
            self.progress = 100;
        } else {
            self.completed_at = None;
            self.progress = self.progress.min(99);
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == TaskStatus::InProgress
    }

    /// Hours since the task started, or `None` if it never started.
    pub fn elapsed_hours(&self, now: DateTime<Utc>) -> Option<f64> {
        self.started_at
            .map(|started| (now - started).num_milliseconds() as f64 / 3_600_000.0)
    }

    /// Hours spent: actual if recorded, otherwise the estimate.
    pub fn effective_hours(&self) -> f64 {
        self.actual_hours.unwrap_or(self.estimated_hours)
    }
}
