//! Wave data model.
//!
//! A wave groups tasks that are meant to run in parallel. Its status is
//! never set directly: [`Wave::refresh`] derives it from the contained tasks
//! after every task mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::task::{Task, TaskId, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Blocked,
}

impl std::fmt::Display for WaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaveStatus::NotStarted => write!(f, "not_started"),
            WaveStatus::InProgress => write!(f, "in_progress"),
            WaveStatus::Completed => write!(f, "completed"),
            WaveStatus::Blocked => write!(f, "blocked"),
        }
    }
}

impl WaveStatus {
    /// Derive a wave status from its task statuses.
    ///
    /// All completed wins, then any blocked, then any in progress. An empty
    /// wave has not started.
    pub fn derive<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = TaskStatus>,
    {
        let mut any = false;
        let mut all_completed = true;
        let mut any_blocked = false;
        let mut any_in_progress = false;

        for status in statuses {
            any = true;
            match status {
                TaskStatus::Completed => {}
                TaskStatus::Blocked => {
                    all_completed = false;
                    any_blocked = true;
                }
                TaskStatus::InProgress => {
                    all_completed = false;
                    any_in_progress = true;
                }
                TaskStatus::Pending => all_completed = false,
            }
        }

        if !any {
            WaveStatus::NotStarted
        } else if all_completed {
            WaveStatus::Completed
        } else if any_blocked {
            WaveStatus::Blocked
        } else if any_in_progress {
            WaveStatus::InProgress
        } else {
            WaveStatus::NotStarted
        }
    }
}

/// An ordered execution phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wave {
    pub number: u32,
    pub name: String,
    pub description: String,
    pub status: WaveStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Contained task ids, in plan order.
    pub tasks: Vec<TaskId>,
    /// Prior waves that must fully complete first.
    pub dependencies: BTreeSet<u32>,
    pub parallel: bool,
    /// Informational subset of `tasks`.
    pub critical_path: Vec<TaskId>,
}

impl Wave {
    pub fn new(number: u32, name: &str) -> Self {
        Self {
            number,
            name: name.to_string(),
            description: String::new(),
            status: WaveStatus::NotStarted,
            started_at: None,
            ended_at: None,
            tasks: Vec::new(),
            dependencies: BTreeSet::new(),
            parallel: true,
            critical_path: Vec::new(),
        }
    }

    /// Recompute status and timestamps from the wave's tasks.
    ///
    /// `started_at` is set the first time any task has started, `ended_at`
    /// while every task is completed. Returns `true` if the status changed.
    pub fn refresh<'a, I>(&mut self, tasks: I, now: DateTime<Utc>) -> bool
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let tasks: Vec<&Task> = tasks.into_iter().collect();
        let status = WaveStatus::derive(tasks.iter().map(|t| t.status));

        if self.started_at.is_none() {
            self.started_at = tasks.iter().filter_map(|t| t.started_at).min().or_else(|| {
                (status != WaveStatus::NotStarted && status != WaveStatus::Blocked).then_some(now)
            });
        }

        if status == WaveStatus::Completed {
            if self.ended_at.is_none() {
                self.ended_at = Some(now);
            }
        } else {
            self.ended_at = None;
        }

        let changed = self.status != status;
        self.status = status;
        changed
    }
}
